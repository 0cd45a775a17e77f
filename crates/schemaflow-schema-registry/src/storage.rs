//! Schema Storage Layer
//!
//! Append-only keyed persistence for schema records. Versions for a
//! (subject, format) pair are kept in ascending order; a store must reject a
//! second record with the same (subject, format, version).

use crate::{
    error::{Result, SchemaError},
    types::{NewSchemaRecord, SchemaRecord},
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Schema storage trait
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Persist a new record and return it with its assigned ID.
    ///
    /// Fails with `VersionConflict` when the (subject, format, version)
    /// triple is already taken.
    async fn insert(&self, record: NewSchemaRecord) -> Result<SchemaRecord>;

    /// All records for (subject, format), ascending by version
    async fn find_by_subject_and_format(
        &self,
        subject: &str,
        format: &str,
    ) -> Result<Vec<SchemaRecord>>;

    /// Exact lookup
    async fn find_by_version(
        &self,
        subject: &str,
        format: &str,
        version: i32,
    ) -> Result<Option<SchemaRecord>>;

    /// Get record by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<SchemaRecord>>;

    /// All records of a subject across formats
    async fn find_by_subject(&self, subject: &str) -> Result<Vec<SchemaRecord>>;

    /// Distinct subjects, sorted
    async fn subjects(&self) -> Result<Vec<String>>;

    /// Remove a record; returns false when it did not exist
    async fn delete(&self, id: i32) -> Result<bool>;
}

#[derive(Default)]
struct MemoryState {
    next_id: i32,
    /// Records indexed by ID
    by_id: HashMap<i32, SchemaRecord>,
    /// (subject, format) -> [(version, id)] sorted by version
    versions: HashMap<(String, String), Vec<(i32, i32)>>,
}

/// In-memory schema store
///
/// All indexes live behind one lock so that an insert is atomic with respect
/// to the version index. Suitable for development, testing, and
/// single-server deployments.
#[derive(Default)]
pub struct MemorySchemaStore {
    state: RwLock<MemoryState>,
}

impl MemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchemaStore for MemorySchemaStore {
    async fn insert(&self, record: NewSchemaRecord) -> Result<SchemaRecord> {
        if record.version < 1 {
            return Err(SchemaError::StorageError(format!(
                "version must be positive, got {}",
                record.version
            )));
        }

        let mut state = self.state.write().await;
        let key = (record.subject.clone(), record.format.clone());

        let taken = state
            .versions
            .get(&key)
            .map(|v| v.iter().any(|(ver, _)| *ver == record.version))
            .unwrap_or(false);
        if taken {
            return Err(SchemaError::VersionConflict {
                subject: record.subject,
                format: record.format,
                version: record.version,
            });
        }

        state.next_id += 1;
        let id = state.next_id;
        let stored = SchemaRecord {
            id,
            subject: record.subject,
            format: record.format,
            version: record.version,
            definition: record.definition,
            references: record.references,
        };

        let versions = state.versions.entry(key).or_default();
        let pos = versions.partition_point(|(ver, _)| *ver < stored.version);
        versions.insert(pos, (stored.version, id));
        state.by_id.insert(id, stored.clone());

        tracing::debug!(
            id = id,
            subject = %stored.subject,
            format = %stored.format,
            version = stored.version,
            "Schema record stored"
        );

        Ok(stored)
    }

    async fn find_by_subject_and_format(
        &self,
        subject: &str,
        format: &str,
    ) -> Result<Vec<SchemaRecord>> {
        let state = self.state.read().await;
        let key = (subject.to_string(), format.to_string());
        Ok(state
            .versions
            .get(&key)
            .map(|v| {
                v.iter()
                    .filter_map(|(_, id)| state.by_id.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_by_version(
        &self,
        subject: &str,
        format: &str,
        version: i32,
    ) -> Result<Option<SchemaRecord>> {
        let state = self.state.read().await;
        let key = (subject.to_string(), format.to_string());
        Ok(state
            .versions
            .get(&key)
            .and_then(|v| v.iter().find(|(ver, _)| *ver == version))
            .and_then(|(_, id)| state.by_id.get(id).cloned()))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<SchemaRecord>> {
        let state = self.state.read().await;
        Ok(state.by_id.get(&id).cloned())
    }

    async fn find_by_subject(&self, subject: &str) -> Result<Vec<SchemaRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<SchemaRecord> = state
            .by_id
            .values()
            .filter(|r| r.subject == subject)
            .cloned()
            .collect();
        records.sort_by(|a, b| (&a.format, a.version).cmp(&(&b.format, b.version)));
        Ok(records)
    }

    async fn subjects(&self) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let subjects: BTreeSet<String> = state.versions.keys().map(|(s, _)| s.clone()).collect();
        Ok(subjects.into_iter().collect())
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(record) = state.by_id.remove(&id) else {
            return Ok(false);
        };

        let key = (record.subject.clone(), record.format.clone());
        if let Some(versions) = state.versions.get_mut(&key) {
            versions.retain(|(_, sid)| *sid != id);
            if versions.is_empty() {
                state.versions.remove(&key);
            }
        }

        Ok(true)
    }
}
