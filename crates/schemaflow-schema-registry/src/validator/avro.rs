//! Avro schema validation and matching

use super::{flatten_references, SchemaValidator};
use crate::{
    error::{Result, SchemaError},
    types::SchemaRecord,
};
use apache_avro::Schema as AvroSchema;
use serde_json::{Map, Value as JsonValue};
use std::collections::{HashMap, HashSet};

/// Avro format identifier
pub const AVRO_FORMAT: &str = "avro";

/// Validator for Avro schemas
#[derive(Debug, Clone, Copy, Default)]
pub struct AvroSchemaValidator;

impl AvroSchemaValidator {
    /// Parse `definition` with the named types of `references` in scope.
    ///
    /// Referenced types are inlined at their first use, so the result carries
    /// their fields rather than a bare name.
    pub fn parse(&self, definition: &str, references: &[SchemaRecord]) -> Result<AvroSchema> {
        let dependencies = flatten_references(references)?;
        if dependencies.is_empty() {
            return AvroSchema::parse_str(definition).map_err(invalid_schema);
        }

        let mut inputs: Vec<&str> = dependencies
            .iter()
            .map(|r| r.definition.as_str())
            .collect();
        inputs.push(definition);
        AvroSchema::parse_list(&inputs).map_err(invalid_schema)?;

        let mut named = HashMap::new();
        for dependency in &dependencies {
            collect_named(parse_json(&dependency.definition)?, &mut named);
        }
        let mut json = parse_json(definition)?;
        inline_named(&mut json, None, &named, &mut HashSet::new());
        AvroSchema::parse(&json).map_err(invalid_schema)
    }
}

fn invalid_schema(e: apache_avro::Error) -> SchemaError {
    SchemaError::InvalidSchema(e.to_string())
}

fn parse_json(definition: &str) -> Result<JsonValue> {
    serde_json::from_str(definition)
        .map_err(|e| SchemaError::InvalidSchema(format!("Invalid Avro schema JSON: {}", e)))
}

fn collect_named(json: JsonValue, named: &mut HashMap<String, JsonValue>) {
    match json {
        JsonValue::Array(entries) => {
            for entry in entries {
                collect_named(entry, named);
            }
        }
        JsonValue::Object(obj) => {
            if let Some(name) = declared_name(&obj, None) {
                named.insert(name, JsonValue::Object(obj));
            }
        }
        _ => {}
    }
}

/// Replace the first use of each name in `named` with its definition.
fn inline_named(
    value: &mut JsonValue,
    namespace: Option<&str>,
    named: &HashMap<String, JsonValue>,
    defined: &mut HashSet<String>,
) {
    match value {
        JsonValue::String(reference) => {
            let name = full_name(reference, namespace);
            if defined.contains(&name) || defined.contains(reference.as_str()) {
                return;
            }
            let definition = named.get(&name).or_else(|| named.get(reference.as_str()));
            if let Some(definition) = definition {
                let mut definition = definition.clone();
                inline_named(&mut definition, namespace, named, defined);
                *value = definition;
            }
        }
        JsonValue::Array(branches) => {
            for branch in branches {
                inline_named(branch, namespace, named, defined);
            }
        }
        JsonValue::Object(obj) => {
            let kind = obj.get("type").and_then(JsonValue::as_str).map(str::to_string);
            match kind.as_deref() {
                Some("record") | Some("error") | Some("enum") | Some("fixed") => {
                    let Some(name) = declared_name(obj, namespace) else {
                        return;
                    };
                    let inner = name.rsplit_once('.').map(|(ns, _)| ns.to_string());
                    defined.insert(name);
                    if let Some(JsonValue::Array(fields)) = obj.get_mut("fields") {
                        for field in fields {
                            if let Some(field_type) = field.get_mut("type") {
                                inline_named(field_type, inner.as_deref(), named, defined);
                            }
                        }
                    }
                }
                Some("array") => {
                    if let Some(items) = obj.get_mut("items") {
                        inline_named(items, namespace, named, defined);
                    }
                }
                Some("map") => {
                    if let Some(values) = obj.get_mut("values") {
                        inline_named(values, namespace, named, defined);
                    }
                }
                _ => {
                    if let Some(inner) = obj.get_mut("type") {
                        inline_named(inner, namespace, named, defined);
                    }
                }
            }
        }
        _ => {}
    }
}

fn full_name(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() && !name.contains('.') => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

fn declared_name(obj: &Map<String, JsonValue>, enclosing: Option<&str>) -> Option<String> {
    let name = obj.get("name")?.as_str()?;
    let namespace = obj
        .get("namespace")
        .and_then(JsonValue::as_str)
        .or(enclosing);
    Some(full_name(name, namespace))
}

impl SchemaValidator for AvroSchemaValidator {
    fn format(&self) -> &str {
        AVRO_FORMAT
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
        let source = self.parse(definition, references)?;
        for candidate in candidates {
            let target = self.parse(&candidate.definition, &candidate.references)?;
            if structurally_equal(&source, &target) {
                return Ok(Some(candidate.clone()));
            }
        }
        Ok(None)
    }

    fn can_read(&self, reader: &SchemaRecord, writer: &SchemaRecord) -> Result<bool> {
        let reader_schema = self.parse(&reader.definition, &reader.references)?;
        let writer_schema = self.parse(&writer.definition, &writer.references)?;
        Ok(reader_can_read(&reader_schema, &writer_schema))
    }
}

/// Parsing Canonical Form equality plus equality of declared field defaults,
/// which the canonical form strips.
pub fn structurally_equal(a: &AvroSchema, b: &AvroSchema) -> bool {
    if a.canonical_form() != b.canonical_form() {
        return false;
    }
    let mut defaults_a = Vec::new();
    let mut defaults_b = Vec::new();
    collect_defaults(a, &mut defaults_a);
    collect_defaults(b, &mut defaults_b);
    defaults_a == defaults_b
}

type FieldDefault = (String, String, Option<serde_json::Value>);

fn collect_defaults(schema: &AvroSchema, out: &mut Vec<FieldDefault>) {
    match schema {
        AvroSchema::Record(record) => {
            let record_name = record.name.fullname(None);
            for field in &record.fields {
                out.push((record_name.clone(), field.name.clone(), field.default.clone()));
                collect_defaults(&field.schema, out);
            }
        }
        AvroSchema::Union(union) => {
            for variant in union.variants() {
                collect_defaults(variant, out);
            }
        }
        AvroSchema::Array(inner) | AvroSchema::Map(inner) => collect_defaults(inner, out),
        _ => {}
    }
}

/// Reader/writer resolution rule used for compatibility checks.
///
/// Records must share a name; every reader field must exist in the writer
/// with a readable type or declare a default.
pub fn reader_can_read(reader: &AvroSchema, writer: &AvroSchema) -> bool {
    match (reader, writer) {
        (r, w) if r.canonical_form() == w.canonical_form() => true,

        (AvroSchema::Record(r), AvroSchema::Record(w)) => {
            if r.name != w.name {
                return false;
            }

            r.fields.iter().all(|reader_field| {
                match w.fields.iter().find(|f| f.name == reader_field.name) {
                    Some(writer_field) => reader_can_read(&reader_field.schema, &writer_field.schema),
                    None => reader_field.default.is_some(),
                }
            })
        }

        (AvroSchema::Union(r), AvroSchema::Union(w)) => w
            .variants()
            .iter()
            .all(|wv| r.variants().iter().any(|rv| reader_can_read(rv, wv))),

        (AvroSchema::Union(r), w) => r.variants().iter().any(|rv| reader_can_read(rv, w)),

        (r, AvroSchema::Union(w)) => w.variants().iter().all(|wv| reader_can_read(r, wv)),

        _ => primitive_promotes(reader, writer),
    }
}

fn primitive_promotes(reader: &AvroSchema, writer: &AvroSchema) -> bool {
    matches!(
        (reader, writer),
        (AvroSchema::Long, AvroSchema::Int)
            | (AvroSchema::Float, AvroSchema::Int)
            | (AvroSchema::Float, AvroSchema::Long)
            | (AvroSchema::Double, AvroSchema::Int)
            | (AvroSchema::Double, AvroSchema::Long)
            | (AvroSchema::Double, AvroSchema::Float)
            | (AvroSchema::String, AvroSchema::Bytes)
            | (AvroSchema::Bytes, AvroSchema::String)
    )
}
