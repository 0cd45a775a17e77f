//! Error types for schemaflow client operations.
//!
//! Errors are categorized by where they arise: talking to the registry,
//! determining a schema for an outgoing payload, or reconciling writer and
//! reader schemas for an incoming one.
//!
//! ## Error Handling Strategy
//!
//! - **Retriable errors**: `RegistryUnavailable` (never retried internally)
//! - **Absent data**: `SchemaNotFound`
//! - **Client errors**: `RegistrationRejected`, `InvalidSchema`, `ConfigError`
//! - **Per-message errors**: `SchemaResolutionError`, `MissingDefault`,
//!   `DecodeConfiguration`, `InvalidEnvelope`, `SerializationError`,
//!   `DeserializationError`
//!
//! ## Examples
//!
//! ```ignore
//! use schemaflow_client::{ClientError, SchemaResolver};
//!
//! match resolver.decode(&message).await {
//!     Ok(record) => println!("Decoded: {:?}", record.value),
//!     Err(ClientError::RegistryUnavailable(reason)) => {
//!         eprintln!("Registry unreachable, message can be redelivered: {}", reason);
//!     }
//!     Err(e) => eprintln!("Rejecting message: {}", e),
//! }
//! ```

use thiserror::Error;

/// Convenience type alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error type for schemaflow client operations.
///
/// `Clone` so that one failed cache load can be handed to every caller that
/// was waiting on the same key.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The registry could not be reached or answered with a server error.
    ///
    /// ## Causes
    /// - Registry is down or the endpoint is wrong
    /// - Request exceeded the client timeout
    /// - Registry returned a 5xx status or an unreadable body
    ///
    /// ## Resolution
    /// - Fatal for the message being decoded; the surrounding messaging
    ///   infrastructure decides whether to redeliver
    #[error("Schema registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Lookup miss for an id or (subject, format, version).
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    /// The registry refused a registration (unsupported format, invalid or
    /// incompatible schema).
    #[error("Schema registration rejected with status {status}: {message}")]
    RegistrationRejected { status: u16, message: String },

    /// A schema definition could not be parsed locally.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// No schema could be determined for an outgoing payload.
    ///
    /// ## Causes
    /// - No configured schema matches the payload's type name
    /// - Dynamic schema generation is disabled
    ///
    /// ## Resolution
    /// - Add the schema to `schemaLocations`, or
    /// - Enable `dynamicSchemaGenerationEnabled`
    #[error("Unable to resolve schema: {0}")]
    SchemaResolutionError(String),

    /// A reader-only field has no declared default.
    #[error("Field '{field}' of '{record}' is missing from the writer schema and declares no default")]
    MissingDefault { record: String, field: String },

    /// Decoding into a fixed native type without a configured reader schema.
    #[error("Decode configuration error: {0}")]
    DecodeConfiguration(String),

    /// Content type or id framing could not be read.
    #[error("Invalid message envelope: {0}")]
    InvalidEnvelope(String),

    /// Payload could not be encoded with the resolved schema.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Payload could not be decoded with the writer schema.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Invalid client configuration.
    ///
    /// ## Causes
    /// - Unreadable schema location or import file
    /// - Invalid registry endpoint
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
