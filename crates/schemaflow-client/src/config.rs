//! Client configuration
//!
//! [`ResolverConfig`] is the format-agnostic configuration surface of the
//! schema resolver. It deserializes from camel-case JSON:
//!
//! ```json
//! {
//!   "readerSchema": {"location": "schemas/user-v2.avsc"},
//!   "schemaLocations": ["schemas/user.avsc"],
//!   "schemaImports": ["schemas/imports/address.avsc"],
//!   "dynamicSchemaGenerationEnabled": false,
//!   "subjectNamingStrategy": "qualified",
//!   "prefix": "vnd",
//!   "referenceStyle": "contentType",
//!   "cache": {"enabled": true, "name": "schemaflow.schemas", "maxCapacity": 10000, "timeToLiveSecs": 3600}
//! }
//! ```
//!
//! Every key is optional.

use crate::{
    envelope::DEFAULT_PREFIX,
    error::{ClientError, Result},
    naming::{DefaultSubjectNamingStrategy, QualifiedSubjectNamingStrategy, SubjectNamingStrategy},
    registry_client::{HttpSchemaRegistryClient, DEFAULT_TIMEOUT},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Name of the cache used when none is configured
pub const DEFAULT_CACHE_NAME: &str = "schemaflow.schemas";

/// Default registry endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8990";

/// Cache switch and bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    /// When false every lookup reaches the registry
    pub enabled: bool,

    /// Named cache to use from the cache manager
    pub name: String,

    /// Maximum number of cached entries
    pub max_capacity: u64,

    /// Entry lifetime; `None` keeps entries until evicted by size
    pub time_to_live_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            name: DEFAULT_CACHE_NAME.to_string(),
            max_capacity: 10_000,
            time_to_live_secs: Some(3600),
        }
    }
}

impl CacheSettings {
    pub fn time_to_live(&self) -> Option<Duration> {
        self.time_to_live_secs.map(Duration::from_secs)
    }
}

/// Which subject naming strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SubjectNamingStrategyKind {
    /// Lower-cased simple type name
    #[default]
    Default,

    /// Fully-qualified type name
    Qualified,
}

impl SubjectNamingStrategyKind {
    pub fn strategy(&self) -> Arc<dyn SubjectNamingStrategy> {
        match self {
            SubjectNamingStrategyKind::Default => Arc::new(DefaultSubjectNamingStrategy),
            SubjectNamingStrategyKind::Qualified => Arc::new(QualifiedSubjectNamingStrategy),
        }
    }
}

/// How an encoded message refers to its writer schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceStyle {
    /// `application/{prefix}.{subject}.v{version}+{format}` content type
    #[default]
    ContentType,

    /// Id framing in the payload, `application/{prefix}.schemaid+{format}`
    SchemaId,
}

/// Where a schema definition comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaSource {
    Location(PathBuf),
    Inline(String),
}

impl SchemaSource {
    pub fn read(&self) -> Result<String> {
        match self {
            SchemaSource::Location(path) => read_schema_file(path),
            SchemaSource::Inline(definition) => Ok(definition.clone()),
        }
    }
}

pub(crate) fn read_schema_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ClientError::ConfigError(format!("Failed to read schema '{}': {}", path.display(), e))
    })
}

/// Schema resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    /// Schema to decode into; without one, messages decode with their writer schema
    pub reader_schema: Option<SchemaSource>,

    /// Schema files looked up by payload type name when encoding
    pub schema_locations: Vec<PathBuf>,

    /// Schema files whose named types every other schema may reference
    pub schema_imports: Vec<PathBuf>,

    /// Derive schemas from payload shape when no configured schema matches
    pub dynamic_schema_generation_enabled: bool,

    pub subject_naming_strategy: SubjectNamingStrategyKind,

    /// Vendor prefix of generated content types
    pub prefix: String,

    pub reference_style: ReferenceStyle,

    pub cache: CacheSettings,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            reader_schema: None,
            schema_locations: Vec::new(),
            schema_imports: Vec::new(),
            dynamic_schema_generation_enabled: false,
            subject_naming_strategy: SubjectNamingStrategyKind::Default,
            prefix: DEFAULT_PREFIX.to_string(),
            reference_style: ReferenceStyle::ContentType,
            cache: CacheSettings::default(),
        }
    }
}

impl ResolverConfig {
    pub fn builder() -> ResolverConfigBuilder {
        ResolverConfigBuilder::new()
    }

    /// Parse a camel-case JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ClientError::ConfigError(format!("Invalid resolver configuration: {}", e)))
    }
}

/// Builder for [`ResolverConfig`]
///
/// # Examples
///
/// ```ignore
/// let config = ResolverConfig::builder()
///     .reader_schema_location("schemas/user-v2.avsc")
///     .dynamic_schema_generation(true)
///     .subject_naming_strategy(SubjectNamingStrategyKind::Qualified)
///     .cache_enabled(false)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResolverConfigBuilder {
    config: ResolverConfig,
}

impl ResolverConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader_schema(mut self, definition: impl Into<String>) -> Self {
        self.config.reader_schema = Some(SchemaSource::Inline(definition.into()));
        self
    }

    pub fn reader_schema_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.reader_schema = Some(SchemaSource::Location(path.into()));
        self
    }

    pub fn schema_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema_locations.push(path.into());
        self
    }

    pub fn schema_import(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema_imports.push(path.into());
        self
    }

    pub fn dynamic_schema_generation(mut self, enabled: bool) -> Self {
        self.config.dynamic_schema_generation_enabled = enabled;
        self
    }

    pub fn subject_naming_strategy(mut self, kind: SubjectNamingStrategyKind) -> Self {
        self.config.subject_naming_strategy = kind;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    pub fn reference_style(mut self, style: ReferenceStyle) -> Self {
        self.config.reference_style = style;
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache.enabled = enabled;
        self
    }

    pub fn cache_name(mut self, name: impl Into<String>) -> Self {
        self.config.cache.name = name.into();
        self
    }

    pub fn cache_capacity(mut self, max_capacity: u64) -> Self {
        self.config.cache.max_capacity = max_capacity;
        self
    }

    pub fn build(self) -> ResolverConfig {
        self.config
    }
}

/// Registry endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryClientConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for RegistryClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl RegistryClientConfig {
    /// HTTP client for the configured endpoint
    pub fn connect(&self) -> Result<HttpSchemaRegistryClient> {
        HttpSchemaRegistryClient::with_timeout(&self.endpoint, Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert!(config.reader_schema.is_none());
        assert!(!config.dynamic_schema_generation_enabled);
        assert_eq!(config.prefix, "vnd");
        assert_eq!(config.reference_style, ReferenceStyle::ContentType);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.name, DEFAULT_CACHE_NAME);
    }

    #[test]
    fn test_from_json() {
        let config = ResolverConfig::from_json(
            r#"{
                "readerSchema": {"location": "schemas/user.avsc"},
                "schemaImports": ["a.avsc", "b.avsc"],
                "dynamicSchemaGenerationEnabled": true,
                "subjectNamingStrategy": "qualified",
                "referenceStyle": "schemaId",
                "cache": {"enabled": false}
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.reader_schema,
            Some(SchemaSource::Location(PathBuf::from("schemas/user.avsc")))
        );
        assert_eq!(config.schema_imports.len(), 2);
        assert!(config.dynamic_schema_generation_enabled);
        assert_eq!(
            config.subject_naming_strategy,
            SubjectNamingStrategyKind::Qualified
        );
        assert_eq!(config.reference_style, ReferenceStyle::SchemaId);
        assert!(!config.cache.enabled);
        // Unset cache keys keep their defaults
        assert_eq!(config.cache.max_capacity, 10_000);
        assert_eq!(config.prefix, "vnd");
    }

    #[test]
    fn test_from_json_rejects_unknown_strategy() {
        let err = ResolverConfig::from_json(r#"{"subjectNamingStrategy": "random"}"#).unwrap_err();
        assert!(matches!(err, ClientError::ConfigError(_)));
    }

    #[test]
    fn test_builder() {
        let config = ResolverConfig::builder()
            .reader_schema(r#""string""#)
            .schema_location("user.avsc")
            .dynamic_schema_generation(true)
            .prefix("acme")
            .cache_enabled(false)
            .cache_name("orders")
            .build();

        assert_eq!(
            config.reader_schema,
            Some(SchemaSource::Inline(r#""string""#.to_string()))
        );
        assert_eq!(config.schema_locations, vec![PathBuf::from("user.avsc")]);
        assert_eq!(config.prefix, "acme");
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.name, "orders");
    }

    #[test]
    fn test_registry_client_config() {
        let client = RegistryClientConfig::default().connect().unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8990/");
    }
}
