//! Format Validators
//!
//! One [`SchemaValidator`] per schema language, selected by format name from a
//! [`ValidatorRegistry`] populated at startup. Validators are stateless: every
//! call builds a fresh parser context, loads the references into it, then
//! parses the definition.

pub mod avro;
pub mod json;

pub use avro::{AvroSchemaValidator, AVRO_FORMAT};
pub use json::{JsonSchemaValidator, JSON_FORMAT};

use crate::{
    error::{Result, SchemaError},
    types::SchemaRecord,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Structural validation and equivalence for one schema format.
pub trait SchemaValidator: Send + Sync {
    /// Format name this validator handles; the dispatch key.
    fn format(&self) -> &str;

    /// Parse `definition` after loading `references` into the parser context.
    ///
    /// Fails with `InvalidSchema` carrying the parser's message.
    fn validate(&self, definition: &str, references: &[SchemaRecord]) -> Result<()>;

    /// Same as [`validate`](Self::validate) but never fails.
    fn is_valid(&self, definition: &str, references: &[SchemaRecord]) -> bool {
        self.validate(definition, references).is_ok()
    }

    /// First candidate, in input order, that is structurally equal to
    /// `definition`. Each candidate is parsed with its own references.
    fn find_match(
        &self,
        candidates: &[SchemaRecord],
        definition: &str,
        references: &[SchemaRecord],
    ) -> Result<Option<SchemaRecord>>;

    /// Whether data written with `writer` can be read with `reader`.
    fn can_read(&self, reader: &SchemaRecord, writer: &SchemaRecord) -> Result<bool> {
        let _ = (reader, writer);
        Ok(true)
    }
}

/// Validators keyed by format name.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn SchemaValidator>>,
}

impl ValidatorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `avro` and `json` validators
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AvroSchemaValidator));
        registry.register(Arc::new(JsonSchemaValidator));
        registry
    }

    /// Add a validator, replacing any previous one for the same format
    pub fn register(&mut self, validator: Arc<dyn SchemaValidator>) {
        self.validators
            .insert(validator.format().to_string(), validator);
    }

    /// Validator for `format`, or `UnsupportedFormat`
    pub fn get(&self, format: &str) -> Result<Arc<dyn SchemaValidator>> {
        self.validators
            .get(format)
            .cloned()
            .ok_or_else(|| SchemaError::UnsupportedFormat {
                format: format.to_string(),
                supported: self.formats().join(", "),
            })
    }

    /// Supported format names, sorted
    pub fn formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.validators.keys().cloned().collect();
        formats.sort();
        formats
    }
}

/// Flatten a reference list into parse order.
///
/// Depth-first in list order with dependencies before dependents. A record
/// reached twice is emitted once; a record reached again while its own
/// dependencies are being visited is a cycle.
pub fn flatten_references(references: &[SchemaRecord]) -> Result<Vec<&SchemaRecord>> {
    let mut done = HashSet::new();
    let mut path = Vec::new();
    let mut ordered = Vec::new();
    for reference in references {
        visit(reference, &mut done, &mut path, &mut ordered)?;
    }
    Ok(ordered)
}

fn visit<'a>(
    record: &'a SchemaRecord,
    done: &mut HashSet<i32>,
    path: &mut Vec<i32>,
    ordered: &mut Vec<&'a SchemaRecord>,
) -> Result<()> {
    if done.contains(&record.id) {
        return Ok(());
    }
    if path.contains(&record.id) {
        return Err(SchemaError::InvalidSchema(format!(
            "cyclic schema reference through {}",
            record.key()
        )));
    }

    path.push(record.id);
    for dependency in &record.references {
        visit(dependency, done, path, ordered)?;
    }
    path.pop();

    done.insert(record.id);
    ordered.push(record);
    Ok(())
}

#[cfg(test)]
pub(crate) fn record(id: i32, subject: &str, definition: &str) -> SchemaRecord {
    SchemaRecord {
        id,
        subject: subject.to_string(),
        format: AVRO_FORMAT.to_string(),
        version: 1,
        definition: definition.to_string(),
        references: vec![],
    }
}
