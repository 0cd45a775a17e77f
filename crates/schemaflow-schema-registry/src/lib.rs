//! schemaflow Schema Registry
//!
//! Stores versioned schema definitions keyed by subject and format, resolves
//! whether a submitted definition matches an existing version, and mints the
//! next version when it does not.
//!
//! # Features
//!
//! - **Schema Formats**: Avro and JSON Schema, pluggable through [`SchemaValidator`]
//! - **Versioning**: Contiguous versions per (subject, format), idempotent registration
//! - **References**: Definitions may import named types from other records
//! - **Compatibility**: Optional backward, forward, full (and transitive) checks
//! - **REST API**: axum HTTP surface
//!
//! # Usage
//!
//! ```ignore
//! use schemaflow_schema_registry::{
//!     MemorySchemaStore, RegisterSchemaRequest, RegistryConfig, SchemaRegistry, ValidatorRegistry,
//! };
//!
//! let registry = SchemaRegistry::new(
//!     Arc::new(MemorySchemaStore::new()),
//!     ValidatorRegistry::with_defaults(),
//!     RegistryConfig::default(),
//! );
//!
//! let schema = r#"{"type": "record", "name": "User", "fields": [{"name": "name", "type": "string"}]}"#;
//! let record = registry
//!     .register(RegisterSchemaRequest {
//!         subject: "user".to_string(),
//!         format: "avro".to_string(),
//!         definition: schema.to_string(),
//!         references: vec![],
//!     })
//!     .await?;
//!
//! let same = registry.get_by_id(record.id).await?;
//! ```

pub mod api;
pub mod compatibility;
pub mod config;
pub mod error;
pub mod registry;
pub mod storage;
pub mod types;
pub mod validator;

pub use api::SchemaRegistryApi;
pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
pub use storage::{MemorySchemaStore, SchemaStore};
pub use types::*;
pub use validator::{
    AvroSchemaValidator, JsonSchemaValidator, SchemaValidator, ValidatorRegistry,
};
