//! Shared fixtures for client integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use schemaflow_client::{ClientError, RegisteredSchema, Result, SchemaRegistryClient};
use schemaflow_schema_registry::{
    MemorySchemaStore, RegisterSchemaRequest, RegistryConfig, SchemaError, SchemaRecord,
    SchemaRegistry, ValidatorRegistry,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const USER_V1: &str = r#"{
    "type": "record", "name": "User1", "namespace": "example.avro",
    "fields": [
        {"name": "name", "type": "string"},
        {"name": "favoriteColor", "type": "string"}
    ]
}"#;

pub const USER_V2: &str = r#"{
    "type": "record", "name": "User1", "namespace": "example.avro",
    "fields": [
        {"name": "name", "type": "string"},
        {"name": "favoriteColor", "type": "string"},
        {"name": "favoritePlace", "type": "string", "default": "NYC"}
    ]
}"#;

pub fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::new(
        Arc::new(MemorySchemaStore::new()),
        ValidatorRegistry::with_defaults(),
        RegistryConfig::default(),
    ))
}

/// Registry client calling a registry in the same process
pub struct InProcessRegistry {
    registry: Arc<SchemaRegistry>,
    pub registrations: AtomicUsize,
    pub lookups: AtomicUsize,
}

impl InProcessRegistry {
    pub fn new(registry: Arc<SchemaRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            registrations: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
        })
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

fn registered(record: SchemaRecord) -> RegisteredSchema {
    RegisteredSchema {
        id: record.id,
        subject: record.subject,
        format: record.format,
        version: record.version,
        definition: record.definition,
        references: record.references.into_iter().map(registered).collect(),
    }
}

fn client_error(error: SchemaError) -> ClientError {
    match error {
        SchemaError::SchemaNotFound(message) => ClientError::SchemaNotFound(message),
        e @ (SchemaError::UnsupportedFormat { .. }
        | SchemaError::InvalidSchema(_)
        | SchemaError::InvalidRequest(_)) => ClientError::RegistrationRejected {
            status: 400,
            message: e.to_string(),
        },
        e @ SchemaError::IncompatibleSchema(_) => ClientError::RegistrationRejected {
            status: 409,
            message: e.to_string(),
        },
        e => ClientError::RegistryUnavailable(e.to_string()),
    }
}

#[async_trait]
impl SchemaRegistryClient for InProcessRegistry {
    async fn register(
        &self,
        subject: &str,
        format: &str,
        definition: &str,
    ) -> Result<RegisteredSchema> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        self.registry
            .register(RegisterSchemaRequest {
                subject: subject.to_string(),
                format: format.to_string(),
                definition: definition.to_string(),
                references: vec![],
            })
            .await
            .map(registered)
            .map_err(client_error)
    }

    async fn fetch_by_id(&self, id: i32) -> Result<RegisteredSchema> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.registry
            .get_by_id(id)
            .await
            .map(registered)
            .map_err(client_error)
    }

    async fn fetch(&self, subject: &str, format: &str, version: i32) -> Result<RegisteredSchema> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.registry
            .get_version(subject, format, version)
            .await
            .map(registered)
            .map_err(client_error)
    }

    async fn fetch_latest(&self, subject: &str, format: &str) -> Result<RegisteredSchema> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.registry
            .get_latest(subject, format)
            .await
            .map(registered)
            .map_err(client_error)
    }
}

/// Write `contents` to `dir/name`
pub fn schema_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write schema file");
    path
}
