//! Schema Registry Service
//!
//! Central service for registering, versioning, and deleting schemas.
//!
//! Version assignment for a (subject, format) pair runs under a per-key
//! async mutex: "load existing versions → match → assign next version →
//! persist" is one critical section. Reads never take the lock.

use crate::{
    compatibility::check_compatibility,
    config::RegistryConfig,
    error::{Result, SchemaError},
    storage::SchemaStore,
    types::*,
    validator::ValidatorRegistry,
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Schema Registry Service
pub struct SchemaRegistry {
    store: Arc<dyn SchemaStore>,
    validators: ValidatorRegistry,
    config: RegistryConfig,
    registration_locks: DashMap<(String, String), Arc<Mutex<()>>>,
}

impl SchemaRegistry {
    /// Create a new schema registry
    pub fn new(
        store: Arc<dyn SchemaStore>,
        validators: ValidatorRegistry,
        config: RegistryConfig,
    ) -> Self {
        Self {
            store,
            validators,
            config,
            registration_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Format names with a registered validator
    pub fn formats(&self) -> Vec<String> {
        self.validators.formats()
    }

    /// Register a schema, returning the structurally equal existing record
    /// or a newly minted version.
    pub async fn register(&self, request: RegisterSchemaRequest) -> Result<SchemaRecord> {
        if request.subject.trim().is_empty() {
            return Err(SchemaError::InvalidRequest(
                "subject must not be empty".to_string(),
            ));
        }

        let validator = self.validators.get(&request.format)?;
        let references = self.resolve_references(&request.references).await?;
        validator.validate(&request.definition, &references)?;

        let lock = self.registration_lock(&request.subject, &request.format);
        let _guard = lock.lock().await;

        let existing = self
            .store
            .find_by_subject_and_format(&request.subject, &request.format)
            .await?;

        if let Some(found) = validator.find_match(&existing, &request.definition, &references)? {
            debug!(
                subject = %found.subject,
                format = %found.format,
                version = found.version,
                id = found.id,
                "Schema matched existing version"
            );
            return Ok(found);
        }

        let version = existing.last().map(|r| r.version + 1).unwrap_or(1);

        if !existing.is_empty() {
            let candidate = SchemaRecord {
                id: 0,
                subject: request.subject.clone(),
                format: request.format.clone(),
                version,
                definition: request.definition.clone(),
                references: references.clone(),
            };
            check_compatibility(
                validator.as_ref(),
                self.config.compatibility,
                &existing,
                &candidate,
            )?;
        }

        let record = self
            .store
            .insert(NewSchemaRecord {
                subject: request.subject,
                format: request.format,
                version,
                definition: request.definition,
                references,
            })
            .await?;

        info!(
            subject = %record.subject,
            format = %record.format,
            version = record.version,
            id = record.id,
            "Registered new schema version"
        );

        Ok(record)
    }

    /// Get schema by exact (subject, format, version)
    pub async fn get_version(
        &self,
        subject: &str,
        format: &str,
        version: i32,
    ) -> Result<SchemaRecord> {
        self.store
            .find_by_version(subject, format, version)
            .await?
            .ok_or_else(|| SchemaError::version_not_found(subject, format, version))
    }

    /// All versions for (subject, format), ascending
    pub async fn get_versions(&self, subject: &str, format: &str) -> Result<Vec<SchemaRecord>> {
        let records = self.store.find_by_subject_and_format(subject, format).await?;
        if records.is_empty() {
            return Err(SchemaError::SchemaNotFound(format!(
                "No schemas found for subject '{}' and format '{}'",
                subject, format
            )));
        }
        Ok(records)
    }

    /// Highest version for (subject, format)
    pub async fn get_latest(&self, subject: &str, format: &str) -> Result<SchemaRecord> {
        let mut records = self.get_versions(subject, format).await?;
        records.pop().ok_or_else(|| {
            SchemaError::SchemaNotFound(format!("subject '{}' format '{}'", subject, format))
        })
    }

    /// Get schema by ID
    pub async fn get_by_id(&self, id: i32) -> Result<SchemaRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| SchemaError::id_not_found(id))
    }

    /// Get all subjects
    pub async fn subjects(&self) -> Result<Vec<String>> {
        self.store.subjects().await
    }

    /// Delete one version
    pub async fn delete_version(
        &self,
        subject: &str,
        format: &str,
        version: i32,
    ) -> Result<SchemaRecord> {
        self.ensure_deletion_allowed()?;
        let record = self.get_version(subject, format, version).await?;
        self.remove(record).await
    }

    /// Delete the highest version of (subject, format)
    pub async fn delete_latest(&self, subject: &str, format: &str) -> Result<SchemaRecord> {
        self.ensure_deletion_allowed()?;
        let record = self.get_latest(subject, format).await?;
        self.remove(record).await
    }

    /// Delete the record with `id`
    pub async fn delete_by_id(&self, id: i32) -> Result<SchemaRecord> {
        self.ensure_deletion_allowed()?;
        let record = self.get_by_id(id).await?;
        self.remove(record).await
    }

    /// Delete every record of `subject`, across formats
    pub async fn delete_subject(&self, subject: &str) -> Result<Vec<SchemaRecord>> {
        self.ensure_deletion_allowed()?;
        let mut deleted = Vec::new();
        for record in self.store.find_by_subject(subject).await? {
            deleted.push(self.remove(record).await?);
        }
        // Locks still held or awaited stay in the table
        self.registration_locks
            .retain(|(locked, _), lock| locked != subject || Arc::strong_count(lock) > 1);
        Ok(deleted)
    }

    fn ensure_deletion_allowed(&self) -> Result<()> {
        if self.config.allow_schema_deletion {
            Ok(())
        } else {
            Err(SchemaError::SchemaDeletionNotAllowed)
        }
    }

    async fn remove(&self, record: SchemaRecord) -> Result<SchemaRecord> {
        if !self.store.delete(record.id).await? {
            return Err(SchemaError::id_not_found(record.id));
        }
        info!(
            subject = %record.subject,
            format = %record.format,
            version = record.version,
            id = record.id,
            "Deleted schema version"
        );
        Ok(record)
    }

    async fn resolve_references(&self, keys: &[SchemaKey]) -> Result<Vec<SchemaRecord>> {
        let mut references = Vec::with_capacity(keys.len());
        for key in keys {
            let record = self
                .store
                .find_by_version(&key.subject, &key.format, key.version)
                .await?
                .ok_or_else(|| {
                    SchemaError::InvalidSchema(format!("Referenced schema {} does not exist", key))
                })?;
            references.push(record);
        }
        Ok(references)
    }

    fn registration_lock(&self, subject: &str, format: &str) -> Arc<Mutex<()>> {
        self.registration_locks
            .entry((subject.to_string(), format.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
