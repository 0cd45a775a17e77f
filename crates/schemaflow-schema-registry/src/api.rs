//! REST API for Schema Registry
//!
//! | Method | Path                            | Result                              |
//! |--------|---------------------------------|-------------------------------------|
//! | POST   | `/`                             | 201 + `Location`, registered record |
//! | GET    | `/{subject}/{format}/v{n}`      | record                              |
//! | GET    | `/{subject}/{format}/latest`    | highest version                     |
//! | GET    | `/{subject}/{format}`           | all versions, ascending             |
//! | GET    | `/schemas/{id}`                 | record                              |
//! | GET    | `/subjects`                     | subject names                       |
//! | DELETE | `/{subject}/{format}/v{n}`      | deleted record                      |
//! | DELETE | `/schemas/{id}`                 | deleted record                      |
//! | DELETE | `/{subject}`                    | deleted records                     |
//!
//! The `/schemas/{id}` route shadows a subject literally named `schemas`.

use crate::{
    error::{Result, SchemaError},
    registry::SchemaRegistry,
    types::*,
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Schema Registry API Server
pub struct SchemaRegistryApi {
    registry: Arc<SchemaRegistry>,
}

impl SchemaRegistryApi {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Create router with all API endpoints
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", post(register_schema))
            .route("/health", get(health_check))
            .route("/subjects", get(list_subjects))
            // Schemas by ID
            .route(
                "/schemas/:id",
                get(get_schema_by_id).delete(delete_schema_by_id),
            )
            // Subjects
            .route("/:subject", delete(delete_subject))
            .route("/:subject/:format", get(list_versions))
            .route(
                "/:subject/:format/:version",
                get(get_schema_by_version).delete(delete_schema_version),
            )
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.registry))
    }

    /// Start the API server
    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(self, listener: tokio::net::TcpListener) -> Result<()> {
        let app = self.router();

        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, "Schema Registry API server listening");
        }

        axum::serve(listener, app).await?;

        Ok(())
    }
}

// API Handlers

/// Register a schema
async fn register_schema(
    State(registry): State<Arc<SchemaRegistry>>,
    Json(request): Json<RegisterSchemaRequest>,
) -> Result<impl IntoResponse> {
    let record = registry.register(request).await?;
    let location = format!("/{}/{}/v{}", record.subject, record.format, record.version);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(record),
    ))
}

/// Get schema by subject, format and version (`v3`, `3` or `latest`)
async fn get_schema_by_version(
    State(registry): State<Arc<SchemaRegistry>>,
    Path((subject, format, version)): Path<(String, String, String)>,
) -> Result<Json<SchemaRecord>> {
    let record = match parse_version(&version)? {
        Some(version) => registry.get_version(&subject, &format, version).await?,
        None => registry.get_latest(&subject, &format).await?,
    };
    Ok(Json(record))
}

/// List all versions for a subject and format
async fn list_versions(
    State(registry): State<Arc<SchemaRegistry>>,
    Path((subject, format)): Path<(String, String)>,
) -> Result<Json<Vec<SchemaRecord>>> {
    let records = registry.get_versions(&subject, &format).await?;
    Ok(Json(records))
}

/// Get schema by ID
async fn get_schema_by_id(
    State(registry): State<Arc<SchemaRegistry>>,
    Path(id): Path<i32>,
) -> Result<Json<SchemaRecord>> {
    let record = registry.get_by_id(id).await?;
    Ok(Json(record))
}

/// List all subjects
async fn list_subjects(State(registry): State<Arc<SchemaRegistry>>) -> Result<Json<Vec<String>>> {
    let subjects = registry.subjects().await?;
    Ok(Json(subjects))
}

/// Delete a specific schema version
async fn delete_schema_version(
    State(registry): State<Arc<SchemaRegistry>>,
    Path((subject, format, version)): Path<(String, String, String)>,
) -> Result<Json<SchemaRecord>> {
    let record = match parse_version(&version)? {
        Some(version) => registry.delete_version(&subject, &format, version).await?,
        None => registry.delete_latest(&subject, &format).await?,
    };
    Ok(Json(record))
}

/// Delete a schema by ID
async fn delete_schema_by_id(
    State(registry): State<Arc<SchemaRegistry>>,
    Path(id): Path<i32>,
) -> Result<Json<SchemaRecord>> {
    let record = registry.delete_by_id(id).await?;
    Ok(Json(record))
}

/// Delete a subject
async fn delete_subject(
    State(registry): State<Arc<SchemaRegistry>>,
    Path(subject): Path<String>,
) -> Result<Json<Vec<SchemaRecord>>> {
    let records = registry.delete_subject(&subject).await?;
    Ok(Json(records))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// `None` means latest.
fn parse_version(segment: &str) -> Result<Option<i32>> {
    if segment == "latest" {
        return Ok(None);
    }
    let digits = segment.strip_prefix('v').unwrap_or(segment);
    match digits.parse::<i32>() {
        Ok(version) if version > 0 => Ok(Some(version)),
        _ => Err(SchemaError::InvalidRequest(format!(
            "Invalid version: {}",
            segment
        ))),
    }
}

// Error handling

impl IntoResponse for SchemaError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            SchemaError::UnsupportedFormat { .. } => (StatusCode::BAD_REQUEST, 40001),
            SchemaError::InvalidSchema(_) => (StatusCode::BAD_REQUEST, 40002),
            SchemaError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, 40003),
            SchemaError::SchemaNotFound(_) => (StatusCode::NOT_FOUND, 40401),
            SchemaError::SchemaDeletionNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, 40501),
            SchemaError::IncompatibleSchema(_) => (StatusCode::CONFLICT, 40901),
            SchemaError::VersionConflict { .. } => (StatusCode::CONFLICT, 40902),
            SchemaError::StorageError(_) | SchemaError::IoError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, 50001)
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
