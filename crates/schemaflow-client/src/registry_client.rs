//! HTTP client for Schema Registry
//!
//! Provides a simple interface to register and retrieve schemas from the
//! schemaflow Schema Registry REST API. Every call is a round trip; wrap the
//! client in [`CachingSchemaRegistryClient`](crate::CachingSchemaRegistryClient)
//! to serve repeated lookups locally.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Schema object returned from registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredSchema {
    pub id: i32,
    pub subject: String,
    pub format: String,
    pub version: i32,
    pub definition: String,

    /// Records this definition imports, dependencies first
    #[serde(default)]
    pub references: Vec<RegisteredSchema>,
}

/// Schema registration request
#[derive(Debug, Serialize)]
struct RegisterSchemaRequest<'a> {
    subject: &'a str,
    format: &'a str,
    definition: &'a str,
}

/// Registry operations used by the resolver
#[async_trait]
pub trait SchemaRegistryClient: Send + Sync {
    /// Register a definition, returning the matched or newly created record
    async fn register(
        &self,
        subject: &str,
        format: &str,
        definition: &str,
    ) -> Result<RegisteredSchema>;

    /// Get schema by ID
    async fn fetch_by_id(&self, id: i32) -> Result<RegisteredSchema>;

    /// Get schema by exact (subject, format, version)
    async fn fetch(&self, subject: &str, format: &str, version: i32) -> Result<RegisteredSchema>;

    /// Get the highest version for (subject, format)
    async fn fetch_latest(&self, subject: &str, format: &str) -> Result<RegisteredSchema>;
}

/// HTTP client for Schema Registry operations
#[derive(Debug, Clone)]
pub struct HttpSchemaRegistryClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl HttpSchemaRegistryClient {
    /// Create a new Schema Registry client
    ///
    /// # Arguments
    /// * `endpoint` - Base URL of schema registry (e.g., "http://localhost:8990")
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Create a client whose requests fail after `timeout`
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(endpoint).map_err(|e| {
            ClientError::ConfigError(format!("Invalid registry endpoint '{}': {}", endpoint, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::ConfigError(format!(
                "Invalid registry endpoint '{}'",
                endpoint
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::ConfigError("Invalid registry endpoint".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url, what: &str) -> Result<RegisteredSchema> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::RegistryUnavailable(format!("Failed to fetch schema: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::SchemaNotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::RegistryUnavailable(format!(
                "Schema lookup failed with status {}: {}",
                status, body
            )));
        }

        let schema: RegisteredSchema = response.json().await.map_err(|e| {
            ClientError::RegistryUnavailable(format!("Failed to parse schema response: {}", e))
        })?;

        tracing::debug!(
            schema_id = schema.id,
            subject = %schema.subject,
            format = %schema.format,
            version = schema.version,
            "Schema retrieved successfully"
        );

        Ok(schema)
    }
}

#[async_trait]
impl SchemaRegistryClient for HttpSchemaRegistryClient {
    async fn register(
        &self,
        subject: &str,
        format: &str,
        definition: &str,
    ) -> Result<RegisteredSchema> {
        let request = RegisterSchemaRequest {
            subject,
            format,
            definition,
        };

        let response = self
            .http_client
            .post(self.url(&[""])?)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ClientError::RegistryUnavailable(format!("Failed to register schema: {}", e))
            })?;

        let status = response.status();
        if status.is_client_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::RegistrationRejected {
                status: status.as_u16(),
                message,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::RegistryUnavailable(format!(
                "Schema registration failed with status {}: {}",
                status, body
            )));
        }

        let schema: RegisteredSchema = response.json().await.map_err(|e| {
            ClientError::RegistryUnavailable(format!(
                "Failed to parse registration response: {}",
                e
            ))
        })?;

        tracing::debug!(
            schema_id = schema.id,
            subject = subject,
            format = format,
            version = schema.version,
            "Schema registered successfully"
        );

        Ok(schema)
    }

    async fn fetch_by_id(&self, id: i32) -> Result<RegisteredSchema> {
        let url = self.url(&["schemas", &id.to_string()])?;
        self.get(url, &format!("id {}", id)).await
    }

    async fn fetch(&self, subject: &str, format: &str, version: i32) -> Result<RegisteredSchema> {
        let url = self.url(&[subject, format, &format!("v{}", version)])?;
        self.get(
            url,
            &format!("subject '{}' format '{}' version {}", subject, format, version),
        )
        .await
    }

    async fn fetch_latest(&self, subject: &str, format: &str) -> Result<RegisteredSchema> {
        let url = self.url(&[subject, format, "latest"])?;
        self.get(url, &format!("subject '{}' format '{}'", subject, format))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = HttpSchemaRegistryClient::new("http://localhost:8990").unwrap();
        assert_eq!(
            client.url(&["user", "avro", "v2"]).unwrap().as_str(),
            "http://localhost:8990/user/avro/v2"
        );
        assert_eq!(
            client.url(&["schemas", "7"]).unwrap().as_str(),
            "http://localhost:8990/schemas/7"
        );
        assert_eq!(client.url(&[""]).unwrap().as_str(), "http://localhost:8990/");

        let nested = HttpSchemaRegistryClient::new("http://registry:8990/api/").unwrap();
        assert_eq!(
            nested.url(&["schemas", "1"]).unwrap().as_str(),
            "http://registry:8990/api/schemas/1"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            HttpSchemaRegistryClient::new("not a url"),
            Err(ClientError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_registry() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let client =
            HttpSchemaRegistryClient::with_timeout("http://127.0.0.1:9", Duration::from_millis(500))
                .unwrap();
        let err = client.fetch_by_id(1).await.unwrap_err();
        assert!(matches!(err, ClientError::RegistryUnavailable(_)));
    }
}
