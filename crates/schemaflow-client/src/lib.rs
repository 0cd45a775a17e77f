//! schemaflow client - schema negotiation and Avro encoding
//!
//! This crate turns payloads into messages that reference a registered
//! schema, and messages back into records. It resolves a schema for each
//! outgoing payload, registers it with a schemaflow registry, and on the way
//! in fetches the writer schema and reconciles it with an optional reader
//! schema. Registry lookups go through a bounded cache that can be switched
//! off.
//!
//! # Examples
//!
//! ## Encoding
//!
//! ```ignore
//! use schemaflow_client::{HttpSchemaRegistryClient, ResolverConfig, SchemaResolver};
//!
//! let client = Arc::new(HttpSchemaRegistryClient::new("http://localhost:8990")?);
//! let config = ResolverConfig::builder()
//!     .schema_location("schemas/user.avsc")
//!     .build();
//! let resolver = SchemaResolver::new(client, config)?;
//!
//! let message = resolver.encode(&User { name: "alice".into() }).await?;
//! assert_eq!(message.content_type, "application/vnd.user.v1+avro");
//! ```
//!
//! ## Decoding
//!
//! ```ignore
//! let config = ResolverConfig::builder()
//!     .reader_schema_location("schemas/user-v2.avsc")
//!     .build();
//! let resolver = SchemaResolver::new(client, config)?;
//!
//! for result in resolver.decode_each(&messages).await {
//!     match result {
//!         Ok(record) => println!("Received: {:?}", record.value),
//!         Err(e) => eprintln!("Rejected: {}", e),
//!     }
//! }
//! ```

pub mod avro;
pub mod cache;
pub mod config;
pub mod envelope;
pub mod error;
pub mod naming;
pub mod registry_client;
pub mod resolver;

pub use avro::{AvroSchemaParser, GenericRecord, AVRO_FORMAT};
pub use cache::{
    CachingSchemaRegistryClient, RegistryCache, SchemaCache, SchemaCacheKey, SchemaCacheManager,
};
pub use config::{
    CacheSettings, ReferenceStyle, RegistryClientConfig, ResolverConfig, ResolverConfigBuilder,
    SchemaSource, SubjectNamingStrategyKind,
};
pub use envelope::{Message, SchemaReference};
pub use error::{ClientError, Result};
pub use naming::{
    DefaultSubjectNamingStrategy, QualifiedSubjectNamingStrategy, SubjectNamingStrategy, TypeName,
};
pub use registry_client::{HttpSchemaRegistryClient, RegisteredSchema, SchemaRegistryClient};
pub use resolver::SchemaResolver;

pub use apache_avro::{types::Value as AvroValue, Schema as AvroSchema};
