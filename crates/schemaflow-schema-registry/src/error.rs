//! Schema Registry Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unsupported format '{format}', supported formats are: {supported}")]
    UnsupportedFormat { format: String, supported: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("Schema deletion is not permitted")]
    SchemaDeletionNotAllowed,

    #[error("Schema compatibility error: {0}")]
    IncompatibleSchema(String),

    /// Raised by a store when (subject, format, version) is already taken.
    #[error("Version {version} already exists for subject '{subject}' and format '{format}'")]
    VersionConflict {
        subject: String,
        format: String,
        version: i32,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SchemaError {
    /// Lookup miss for an exact (subject, format, version) key.
    pub fn version_not_found(subject: &str, format: &str, version: i32) -> Self {
        SchemaError::SchemaNotFound(format!(
            "subject '{}' format '{}' version {}",
            subject, format, version
        ))
    }

    /// Lookup miss for a schema id.
    pub fn id_not_found(id: i32) -> Self {
        SchemaError::SchemaNotFound(format!("id {}", id))
    }
}
