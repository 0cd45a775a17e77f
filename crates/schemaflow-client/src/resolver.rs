//! Schema resolver
//!
//! Outbound, [`SchemaResolver::encode`] picks a schema for a payload,
//! registers it, encodes the payload as an Avro datum and wraps it in a
//! [`Message`] whose content type (or id framing) references the registered
//! schema. Inbound, [`SchemaResolver::decode`] fetches the writer schema the
//! message references and, when a reader schema is configured, projects the
//! decoded record onto it.
//!
//! ## Example
//!
//! ```ignore
//! use schemaflow_client::{HttpSchemaRegistryClient, ResolverConfig, SchemaResolver};
//! use std::sync::Arc;
//!
//! let client = Arc::new(HttpSchemaRegistryClient::new("http://localhost:8990")?);
//! let resolver = SchemaResolver::new(
//!     client,
//!     ResolverConfig::builder().dynamic_schema_generation(true).build(),
//! )?;
//!
//! let message = resolver.encode(&user).await?;
//! let record = resolver.decode(&message).await?;
//! ```

use crate::{
    avro::{
        decode_datum, decode_projected, derive_schema, encode_datum, refine_schema,
        schema_definition, schema_type_name, AvroSchemaParser, GenericRecord, AVRO_FORMAT,
    },
    cache::{CachingSchemaRegistryClient, RegistryCache, SchemaCache, SchemaCacheManager},
    config::{read_schema_file, ReferenceStyle, ResolverConfig},
    envelope::{Message, SchemaReference},
    error::{ClientError, Result},
    naming::{SubjectNamingStrategy, TypeName},
    registry_client::{RegisteredSchema, SchemaRegistryClient},
};
use apache_avro::{types::Value, Schema as AvroSchema};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Encodes payloads against registered schemas and decodes them back
pub struct SchemaResolver {
    client: Arc<dyn SchemaRegistryClient>,
    parser: AvroSchemaParser,
    naming: Arc<dyn SubjectNamingStrategy>,
    config: ResolverConfig,

    /// Configured schemas by full and simple name
    static_schemas: HashMap<String, Arc<AvroSchema>>,
    reader_schema: Option<Arc<AvroSchema>>,
    /// Type full name -> last derived schema
    derived_schemas: DashMap<String, Arc<AvroSchema>>,

    /// (subject, definition) -> registration
    registrations: SchemaCache<(String, String), RegisteredSchema>,
    writer_schemas: SchemaCache<SchemaReference, Arc<AvroSchema>>,
}

impl SchemaResolver {
    /// Resolver with its own cache, built from `config.cache`
    pub fn new(client: Arc<dyn SchemaRegistryClient>, config: ResolverConfig) -> Result<Self> {
        let manager = SchemaCacheManager::new(config.cache.clone());
        Self::with_cache_manager(client, config, &manager)
    }

    /// Resolver whose registry lookups go through the cache `manager` holds
    /// under `config.cache.name`.
    pub fn with_cache_manager(
        client: Arc<dyn SchemaRegistryClient>,
        config: ResolverConfig,
        manager: &SchemaCacheManager,
    ) -> Result<Self> {
        let registry_cache = if config.cache.enabled {
            manager.cache(&config.cache.name)
        } else {
            RegistryCache::disabled()
        };
        let client: Arc<dyn SchemaRegistryClient> =
            Arc::new(CachingSchemaRegistryClient::new(client, registry_cache));

        let parser = AvroSchemaParser::with_import_files(&config.schema_imports)?;

        let mut static_schemas = HashMap::new();
        for path in &config.schema_locations {
            let text = read_schema_file(path)?;
            let schemas = parser.parse_all(&text).map_err(|e| {
                ClientError::ConfigError(format!("Invalid schema '{}': {}", path.display(), e))
            })?;
            for schema in schemas {
                let type_name = schema_type_name(&schema).ok_or_else(|| {
                    ClientError::ConfigError(format!(
                        "Schema in '{}' is not a named type",
                        path.display()
                    ))
                })?;
                let schema = Arc::new(schema);
                static_schemas
                    .entry(type_name.name().to_string())
                    .or_insert_with(|| Arc::clone(&schema));
                static_schemas.insert(type_name.full_name(), schema);
            }
        }

        let reader_schema = match &config.reader_schema {
            Some(source) => Some(Arc::new(parser.parse(&source.read()?)?)),
            None => None,
        };

        info!(
            schemas = static_schemas.len(),
            imports = parser.imported_names().len(),
            reader_schema = reader_schema.is_some(),
            dynamic = config.dynamic_schema_generation_enabled,
            cache = config.cache.enabled,
            "Schema resolver ready"
        );

        Ok(Self {
            client,
            naming: config.subject_naming_strategy.strategy(),
            registrations: SchemaCache::from_settings(&config.cache),
            writer_schemas: SchemaCache::from_settings(&config.cache),
            parser,
            static_schemas,
            reader_schema,
            derived_schemas: DashMap::new(),
            config,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn reader_schema(&self) -> Option<&Arc<AvroSchema>> {
        self.reader_schema.as_ref()
    }

    /// Subject `schema` registers under
    pub fn subject_for(&self, schema: &AvroSchema) -> Result<String> {
        let type_name = schema_type_name(schema).ok_or_else(|| {
            ClientError::SchemaResolutionError(
                "schema has no name to derive a subject from".to_string(),
            )
        })?;
        Ok(self.naming.subject(&type_name, AVRO_FORMAT))
    }

    /// Schema a payload of type `T` with serialized form `value` encodes with.
    ///
    /// Derived from the payload when dynamic generation is enabled, otherwise
    /// the configured schema matching the type's qualified name, simple name
    /// or subject.
    pub fn schema_for<T: ?Sized>(&self, value: &Value) -> Result<Arc<AvroSchema>> {
        let type_name = TypeName::of::<T>();

        if self.config.dynamic_schema_generation_enabled {
            return self.derived_schema(&type_name, value);
        }

        let candidates = [
            type_name.full_name(),
            type_name.name().to_string(),
            self.naming.subject(&type_name, AVRO_FORMAT),
        ];
        candidates
            .iter()
            .find_map(|candidate| self.static_schemas.get(candidate))
            .cloned()
            .ok_or_else(|| {
                ClientError::SchemaResolutionError(format!(
                    "no configured schema for {} (tried {}) and dynamic schema generation is disabled",
                    type_name,
                    candidates.join(", ")
                ))
            })
    }

    /// The schema last derived for `type_name` while `value` still fits it,
    /// otherwise a fresh derivation refined by that schema.
    fn derived_schema(&self, type_name: &TypeName, value: &Value) -> Result<Arc<AvroSchema>> {
        let key = type_name.full_name();
        let known = self
            .derived_schemas
            .get(&key)
            .map(|entry| Arc::clone(entry.value()));

        let schema = match known {
            Some(known) if value.clone().resolve(&known).is_ok() => return Ok(known),
            Some(known) => {
                debug!(type_name = %type_name, "Refining derived schema from payload");
                refine_schema(&known, type_name, value)?
            }
            None => {
                debug!(type_name = %type_name, "Deriving schema from payload");
                derive_schema(type_name, value)?
            }
        };

        let schema = Arc::new(schema);
        self.derived_schemas.insert(key, Arc::clone(&schema));
        Ok(schema)
    }

    /// Encode a serde payload
    pub async fn encode<T: Serialize + ?Sized>(&self, payload: &T) -> Result<Message> {
        let value = apache_avro::to_value(payload)
            .map_err(|e| ClientError::SerializationError(e.to_string()))?;
        let schema = self.schema_for::<T>(&value)?;
        self.encode_value(&schema, value).await
    }

    /// Encode a record that carries its own schema
    pub async fn encode_record(&self, record: &GenericRecord) -> Result<Message> {
        self.encode_value(&record.schema, record.value.clone()).await
    }

    async fn encode_value(&self, schema: &AvroSchema, value: Value) -> Result<Message> {
        let registration = self.register(schema).await?;
        let datum = encode_datum(schema, value)?;

        let reference = match self.config.reference_style {
            ReferenceStyle::ContentType => SchemaReference::Version {
                subject: registration.subject,
                format: registration.format,
                version: registration.version,
            },
            ReferenceStyle::SchemaId => SchemaReference::Id {
                format: registration.format,
                id: registration.id,
            },
        };

        debug!(reference = %reference, bytes = datum.len(), "Encoded message");
        Ok(Message::wrap(&reference, &self.config.prefix, &datum))
    }

    /// Register `schema` under its subject, once per distinct definition
    async fn register(&self, schema: &AvroSchema) -> Result<RegisteredSchema> {
        let subject = self.subject_for(schema)?;
        let definition = schema_definition(schema)?;

        self.registrations
            .get_or_load(
                (subject.clone(), definition.clone()),
                async {
                    let registered = self
                        .client
                        .register(&subject, AVRO_FORMAT, &definition)
                        .await?;
                    debug!(
                        subject = %registered.subject,
                        version = registered.version,
                        id = registered.id,
                        "Schema registered"
                    );
                    Ok::<_, ClientError>(registered)
                },
            )
            .await
    }

    /// Decode a message into a generic record, in the reader schema's shape
    /// when one is configured.
    pub async fn decode(&self, message: &Message) -> Result<GenericRecord> {
        let (reference, datum) = message.unwrap(&self.config.prefix)?;
        if reference.format() != AVRO_FORMAT {
            return Err(ClientError::InvalidEnvelope(format!(
                "unsupported format '{}'",
                reference.format()
            )));
        }

        let writer = self.writer_schema(&reference).await?;
        match &self.reader_schema {
            Some(reader) => {
                let value = decode_projected(&writer, reader, &datum)?;
                Ok(GenericRecord::new(Arc::clone(reader), value))
            }
            None => {
                let value = decode_datum(&writer, &datum)?;
                Ok(GenericRecord::new(writer, value))
            }
        }
    }

    /// Decode a message into a native type.
    ///
    /// Requires a configured reader schema: the native type's shape is only
    /// known to serde, so the writer schema alone cannot be reconciled with it.
    pub async fn decode_into<T: DeserializeOwned>(&self, message: &Message) -> Result<T> {
        if self.reader_schema.is_none() {
            return Err(ClientError::DecodeConfiguration(format!(
                "decoding into {} requires a reader schema",
                TypeName::of::<T>()
            )));
        }
        let record = self.decode(message).await?;
        apache_avro::from_value::<T>(&record.value)
            .map_err(|e| ClientError::DeserializationError(e.to_string()))
    }

    /// Decode every message, one result per message
    pub async fn decode_each(&self, messages: &[Message]) -> Vec<Result<GenericRecord>> {
        let mut results = Vec::with_capacity(messages.len());
        for message in messages {
            let result = self.decode(message).await;
            if let Err(e) = &result {
                warn!(content_type = %message.content_type, error = %e, "Rejecting message");
            }
            results.push(result);
        }
        results
    }

    /// Writer schema for `reference`, with the registry's references in scope
    async fn writer_schema(&self, reference: &SchemaReference) -> Result<Arc<AvroSchema>> {
        self.writer_schemas
            .get_or_load(reference.clone(), async {
                let registered = match reference {
                    SchemaReference::Version {
                        subject,
                        format,
                        version,
                    } => self.client.fetch(subject, format, *version).await?,
                    SchemaReference::Id { id, .. } => self.client.fetch_by_id(*id).await?,
                };
                if registered.format != AVRO_FORMAT {
                    return Err(ClientError::InvalidEnvelope(format!(
                        "schema {} is registered as '{}'",
                        reference, registered.format
                    )));
                }

                let mut references = Vec::new();
                collect_references(&registered, &mut references);
                debug!(reference = %reference, "Resolved writer schema");
                Ok(Arc::new(
                    self.parser.parse_with(&registered.definition, &references)?,
                ))
            })
            .await
    }
}

// Dependencies before dependents
fn collect_references(schema: &RegisteredSchema, out: &mut Vec<String>) {
    for reference in &schema.references {
        collect_references(reference, out);
        if !out.contains(&reference.definition) {
            out.push(reference.definition.clone());
        }
    }
}
