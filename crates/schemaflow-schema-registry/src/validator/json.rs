//! JSON Schema validation and matching

use super::{flatten_references, SchemaValidator};
use crate::{
    error::{Result, SchemaError},
    types::SchemaRecord,
};
use jsonschema::JSONSchema;
use serde_json::Value;

/// JSON Schema format identifier
pub const JSON_FORMAT: &str = "json";

/// Validator for JSON Schema documents
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl JsonSchemaValidator {
    fn parse_document(definition: &str) -> Result<Value> {
        let json: Value = serde_json::from_str(definition)
            .map_err(|e| SchemaError::InvalidSchema(format!("Invalid JSON schema: {}", e)))?;

        let Some(object) = json.as_object() else {
            return Err(SchemaError::InvalidSchema(
                "Not a valid JSON Schema (expected an object)".to_string(),
            ));
        };
        if !["$schema", "type", "$ref"].iter().any(|k| object.contains_key(*k)) {
            return Err(SchemaError::InvalidSchema(
                "Not a valid JSON Schema (missing $schema, type or $ref)".to_string(),
            ));
        }

        JSONSchema::compile(&json)
            .map_err(|e| SchemaError::InvalidSchema(format!("Invalid JSON schema: {}", e)))?;

        Ok(json)
    }

    /// Parse `definition` after checking every reference parses.
    pub fn parse(&self, definition: &str, references: &[SchemaRecord]) -> Result<Value> {
        for dependency in flatten_references(references)? {
            Self::parse_document(&dependency.definition).map_err(|e| {
                SchemaError::InvalidSchema(format!("reference {}: {}", dependency.key(), e))
            })?;
        }
        Self::parse_document(definition)
    }

    /// Flattened reference documents, dependencies first
    fn reference_documents(references: &[SchemaRecord]) -> Result<Vec<Value>> {
        flatten_references(references)?
            .into_iter()
            .map(|dependency| Self::parse_document(&dependency.definition))
            .collect()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn format(&self) -> &str {
        JSON_FORMAT
    }

    fn validate(&self, definition: &str, references: &[SchemaRecord]) -> Result<()> {
        self.parse(definition, references).map(|_| ())
    }

    fn find_match(
        &self,
        candidates: &[SchemaRecord],
        definition: &str,
        references: &[SchemaRecord],
    ) -> Result<Option<SchemaRecord>> {
        // serde_json maps compare without regard to key order
        let source = self.parse(definition, references)?;
        let source_references = Self::reference_documents(references)?;
        for candidate in candidates {
            let target = self.parse(&candidate.definition, &candidate.references)?;
            if source == target
                && source_references == Self::reference_documents(&candidate.references)?
            {
                return Ok(Some(candidate.clone()));
            }
        }
        Ok(None)
    }

    fn can_read(&self, reader: &SchemaRecord, writer: &SchemaRecord) -> Result<bool> {
        let reader_json = self.parse(&reader.definition, &reader.references)?;
        let writer_json = self.parse(&writer.definition, &writer.references)?;

        let required = reader_json
            .get("required")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let writer_properties = writer_json.get("properties").and_then(Value::as_object);

        Ok(required.iter().filter_map(Value::as_str).all(|name| {
            writer_properties
                .map(|props| props.contains_key(name))
                .unwrap_or(false)
        }))
    }
}
