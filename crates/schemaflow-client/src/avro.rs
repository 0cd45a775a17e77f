//! Avro schema handling for the client pipeline
//!
//! - [`AvroSchemaParser`] parses definitions with a set of imported named
//!   types available. Imports are inlined into the definition's JSON at their
//!   first use, so every parsed [`AvroSchema`] is self-contained.
//! - [`derive_schema`] builds a record schema from a payload's serde shape,
//!   and [`refine_schema`] merges a new payload into an earlier derivation.
//! - [`project`] reconciles a value written with one record schema to the
//!   field set of another.

use crate::{
    error::{ClientError, Result},
    naming::TypeName,
};
use apache_avro::{types::Value, Schema as AvroSchema};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Avro format identifier
pub const AVRO_FORMAT: &str = "avro";

const PRIMITIVES: [&str; 8] = [
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

/// A dynamically-typed record together with its schema
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    pub schema: Arc<AvroSchema>,
    pub value: Value,
}

impl GenericRecord {
    pub fn new(schema: Arc<AvroSchema>, value: Value) -> Self {
        Self { schema, value }
    }

    /// Field value by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        match &self.value {
            Value::Record(fields) => fields.iter().find(|(name, _)| name == field).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Field value as a string, looking through a union branch
    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self.get(field)? {
            Value::String(s) => Some(s),
            Value::Union(_, inner) => match inner.as_ref() {
                Value::String(s) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Parser with imported named types in scope
#[derive(Debug, Clone, Default)]
pub struct AvroSchemaParser {
    /// Full name -> definition
    imports: HashMap<String, JsonValue>,
}

impl AvroSchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser importing every named type declared in `paths`, in order
    pub fn with_import_files(paths: &[PathBuf]) -> Result<Self> {
        let mut parser = Self::new();
        for path in paths {
            let text = crate::config::read_schema_file(path)?;
            parser.add_import(&text).map_err(|e| {
                ClientError::ConfigError(format!("Invalid schema import '{}': {}", path.display(), e))
            })?;
        }
        Ok(parser)
    }

    /// Import the named type(s) in `definition`: one schema or a JSON array
    /// of schemas.
    pub fn add_import(&mut self, definition: &str) -> Result<()> {
        let json = parse_json(definition)?;
        let entries = match json {
            JsonValue::Array(entries) => entries,
            single => vec![single],
        };

        for entry in entries {
            let name = entry
                .as_object()
                .and_then(|obj| declared_name(obj, None))
                .ok_or_else(|| {
                    ClientError::InvalidSchema("imported schema must declare a named type".to_string())
                })?;
            tracing::debug!(name = %name, "Imported schema");
            self.imports.insert(name, entry);
        }
        Ok(())
    }

    /// Full names of the imported types, sorted
    pub fn imported_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.imports.keys().cloned().collect();
        names.sort();
        names
    }

    /// Parse a single schema definition
    pub fn parse(&self, definition: &str) -> Result<AvroSchema> {
        let mut json = parse_json(definition)?;
        self.inline(&mut json, None, &mut HashSet::new());
        AvroSchema::parse(&json).map_err(|e| ClientError::InvalidSchema(e.to_string()))
    }

    /// Parse `definition` with `references` imported on top of this parser's
    /// imports.
    pub fn parse_with(&self, definition: &str, references: &[String]) -> Result<AvroSchema> {
        if references.is_empty() {
            return self.parse(definition);
        }
        let mut scoped = self.clone();
        for reference in references {
            scoped.add_import(reference)?;
        }
        scoped.parse(definition)
    }

    /// Parse a schema file: one schema, or an array of named schemas that
    /// may reference each other.
    pub fn parse_all(&self, text: &str) -> Result<Vec<AvroSchema>> {
        match parse_json(text)? {
            JsonValue::Array(entries) => {
                let mut scoped = self.clone();
                scoped.add_import(text)?;
                entries
                    .iter()
                    .map(|entry| scoped.parse(&entry.to_string()))
                    .collect()
            }
            _ => Ok(vec![self.parse(text)?]),
        }
    }

    /// Replace the first use of each imported type name with its definition.
    fn inline(&self, value: &mut JsonValue, namespace: Option<&str>, defined: &mut HashSet<String>) {
        match value {
            JsonValue::String(reference) => {
                if PRIMITIVES.contains(&reference.as_str()) {
                    return;
                }
                let name = full_name(reference, namespace);
                if defined.contains(&name) || defined.contains(reference.as_str()) {
                    return;
                }
                let import = self
                    .imports
                    .get(&name)
                    .or_else(|| self.imports.get(reference.as_str()));
                if let Some(definition) = import {
                    let mut definition = definition.clone();
                    self.inline(&mut definition, namespace, defined);
                    *value = definition;
                }
            }
            JsonValue::Array(branches) => {
                for branch in branches {
                    self.inline(branch, namespace, defined);
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
                                    self.inline(field_type, inner.as_deref(), defined);
                                }
                            }
                        }
                    }
                    Some("array") => {
                        if let Some(items) = obj.get_mut("items") {
                            self.inline(items, namespace, defined);
                        }
                    }
                    Some("map") => {
                        if let Some(values) = obj.get_mut("values") {
                            self.inline(values, namespace, defined);
                        }
                    }
                    _ => {
                        if let Some(inner) = obj.get_mut("type") {
                            self.inline(inner, namespace, defined);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn parse_json(definition: &str) -> Result<JsonValue> {
    serde_json::from_str(definition)
        .map_err(|e| ClientError::InvalidSchema(format!("Invalid Avro schema JSON: {}", e)))
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

/// Type name of a named schema
pub fn schema_type_name(schema: &AvroSchema) -> Option<TypeName> {
    schema
        .name()
        .map(|name| TypeName::new(name.namespace.as_deref(), &name.name))
}

/// Full JSON form of `schema`, defaults included
pub fn schema_definition(schema: &AvroSchema) -> Result<String> {
    serde_json::to_string(schema).map_err(|e| ClientError::SerializationError(e.to_string()))
}

/// Record schema for a payload, from the value `apache_avro::to_value`
/// produced for it. Nested structs become records named after their field.
///
/// `Option` fields derive `["null", T]`, or `["null"]` for `None`; empty
/// collections derive `"null"` elements. [`refine_schema`] fills those in
/// from an earlier derivation.
pub fn derive_schema(type_name: &TypeName, value: &Value) -> Result<AvroSchema> {
    let json = payload_json(type_name, value)?;
    AvroSchema::parse(&json).map_err(|e| ClientError::InvalidSchema(e.to_string()))
}

/// Derive a schema for `value`, keeping the element and branch types `known`
/// already carries wherever `value` has none.
pub fn refine_schema(known: &AvroSchema, type_name: &TypeName, value: &Value) -> Result<AvroSchema> {
    let derived = payload_json(type_name, value)?;
    let known =
        serde_json::to_value(known).map_err(|e| ClientError::SerializationError(e.to_string()))?;
    let json = merge_types(&known, derived);
    AvroSchema::parse(&json).map_err(|e| ClientError::InvalidSchema(e.to_string()))
}

fn payload_json(type_name: &TypeName, value: &Value) -> Result<JsonValue> {
    let Value::Record(fields) = value else {
        return Err(ClientError::SchemaResolutionError(format!(
            "cannot derive a record schema for non-struct payload {}",
            type_name
        )));
    };
    record_json(type_name, fields)
}

fn merge_types(known: &JsonValue, derived: JsonValue) -> JsonValue {
    match derived {
        JsonValue::String(name) if name == "null" => known.clone(),
        JsonValue::Array(branches) => {
            let known_branch = known.as_array().and_then(|b| b.get(1));
            match (branches.get(1), known_branch) {
                (Some(branch), Some(known_branch)) => {
                    json!(["null", merge_types(known_branch, branch.clone())])
                }
                (None, Some(known_branch)) => json!(["null", known_branch]),
                _ => JsonValue::Array(branches),
            }
        }
        JsonValue::Object(mut obj) => {
            for key in ["items", "values"] {
                if let (Some(known_inner), Some(inner)) = (known.get(key), obj.get_mut(key)) {
                    *inner = merge_types(known_inner, inner.take());
                }
            }
            if let (Some(JsonValue::Array(known_fields)), Some(JsonValue::Array(fields))) =
                (known.get("fields"), obj.get_mut("fields"))
            {
                for field in fields {
                    let name = field.get("name").cloned();
                    let known_type = known_fields
                        .iter()
                        .find(|f| f.get("name") == name.as_ref())
                        .and_then(|f| f.get("type"));
                    if let (Some(known_type), Some(field_type)) = (known_type, field.get_mut("type")) {
                        *field_type = merge_types(known_type, field_type.take());
                    }
                }
            }
            JsonValue::Object(obj)
        }
        other => other,
    }
}

fn record_json(type_name: &TypeName, fields: &[(String, Value)]) -> Result<JsonValue> {
    let mut field_json = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let nested = TypeName::new(Some(&type_name.full_name()), &capitalize(name));
        field_json.push(json!({"name": name, "type": type_json(&nested, value)?}));
    }

    let mut record = json!({
        "type": "record",
        "name": type_name.name(),
        "fields": field_json,
    });
    if let Some(namespace) = type_name.namespace() {
        record["namespace"] = json!(namespace);
    }
    Ok(record)
}

fn type_json(type_name: &TypeName, value: &Value) -> Result<JsonValue> {
    Ok(match value {
        Value::Null => json!("null"),
        Value::Boolean(_) => json!("boolean"),
        Value::Int(_) => json!("int"),
        Value::Long(_) => json!("long"),
        Value::Float(_) => json!("float"),
        Value::Double(_) => json!("double"),
        Value::Bytes(_) => json!("bytes"),
        Value::String(_) => json!("string"),
        Value::Array(items) => json!({
            "type": "array",
            "items": element_json(type_name, items.first())?,
        }),
        Value::Map(entries) => json!({
            "type": "map",
            "values": element_json(type_name, entries.values().next())?,
        }),
        Value::Record(fields) => record_json(type_name, fields)?,
        Value::Union(_, inner) => match inner.as_ref() {
            Value::Null => json!(["null"]),
            some => json!(["null", type_json(type_name, some)?]),
        },
        other => {
            return Err(ClientError::SchemaResolutionError(format!(
                "cannot derive a schema for {} from value {:?}",
                type_name, other
            )))
        }
    })
}

// Empty collections carry no element type
fn element_json(type_name: &TypeName, first: Option<&Value>) -> Result<JsonValue> {
    match first {
        Some(value) => type_json(type_name, value),
        None => Ok(json!("null")),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Encode `value` as a bare Avro datum of `schema`
pub fn encode_datum(schema: &AvroSchema, value: Value) -> Result<Vec<u8>> {
    let resolved = value
        .resolve(schema)
        .map_err(|e| ClientError::SerializationError(e.to_string()))?;
    apache_avro::to_avro_datum(schema, resolved)
        .map_err(|e| ClientError::SerializationError(e.to_string()))
}

/// Decode a bare Avro datum written with `writer`
pub fn decode_datum(writer: &AvroSchema, datum: &[u8]) -> Result<Value> {
    let mut reader = datum;
    apache_avro::from_avro_datum(writer, &mut reader, None)
        .map_err(|e| ClientError::DeserializationError(e.to_string()))
}

/// Decode `datum` written with `writer` into the shape of `reader`
pub fn decode_projected(writer: &AvroSchema, reader: &AvroSchema, datum: &[u8]) -> Result<Value> {
    let value = decode_datum(writer, datum)?;
    project(value, writer, reader)?
        .resolve(reader)
        .map_err(|e| ClientError::DeserializationError(e.to_string()))
}

/// Reconcile a record written with `writer` to the fields of `reader`.
///
/// Fields in both schemas are copied by name, reader-only fields take the
/// reader's declared default, writer-only fields are dropped. Values that
/// are not records pass through unchanged.
pub fn project(value: Value, writer: &AvroSchema, reader: &AvroSchema) -> Result<Value> {
    match (writer, reader, value) {
        (AvroSchema::Record(w), AvroSchema::Record(r), Value::Record(fields)) => {
            let mut by_name: HashMap<String, Value> = fields.into_iter().collect();
            let mut projected = Vec::with_capacity(r.fields.len());

            for field in &r.fields {
                let writer_field = w.fields.iter().find(|f| f.name == field.name);
                let value = match (writer_field, by_name.remove(&field.name)) {
                    (Some(writer_field), Some(value)) => {
                        project(value, &writer_field.schema, &field.schema)?
                    }
                    _ => match &field.default {
                        Some(default) => Value::from(default.clone()),
                        None => {
                            return Err(ClientError::MissingDefault {
                                record: r.name.fullname(None),
                                field: field.name.clone(),
                            })
                        }
                    },
                };
                projected.push((field.name.clone(), value));
            }

            Ok(Value::Record(projected))
        }
        (_, _, value) => Ok(value),
    }
}
