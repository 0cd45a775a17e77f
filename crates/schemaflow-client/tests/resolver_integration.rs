//! Schema resolver integration tests
//!
//! Encode and decode through a resolver backed by an in-process registry.

mod common;

use common::{registry, schema_file, InProcessRegistry, USER_V1, USER_V2};
use schemaflow_client::{
    AvroSchema, AvroValue, CacheSettings, ClientError, GenericRecord, Message, ResolverConfig,
    SchemaCacheManager, SchemaRegistryClient, SchemaResolver, SubjectNamingStrategyKind,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct User1 {
    name: String,
    favorite_color: String,
}

mod v2 {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct User1 {
        pub name: String,
        pub favorite_color: String,
        pub favorite_place: String,
    }
}

fn alice() -> User1 {
    User1 {
        name: "alice".to_string(),
        favorite_color: "blue".to_string(),
    }
}

fn resolver(client: &Arc<InProcessRegistry>, config: ResolverConfig) -> SchemaResolver {
    SchemaResolver::new(Arc::clone(client) as Arc<dyn SchemaRegistryClient>, config)
        .expect("Failed to create resolver")
}

#[tokio::test]
async fn test_backward_compatible_decode_fills_default() {
    let dir = TempDir::new().unwrap();
    let v1 = schema_file(dir.path(), "user-v1.avsc", USER_V1);
    let v2 = schema_file(dir.path(), "user-v2.avsc", USER_V2);
    let client = InProcessRegistry::new(registry());

    let producer = resolver(&client, ResolverConfig::builder().schema_location(&v1).build());
    let message = producer.encode(&alice()).await.unwrap();
    assert_eq!(message.content_type, "application/vnd.user1.v1+avro");

    let consumer = resolver(
        &client,
        ResolverConfig::builder().reader_schema_location(&v2).build(),
    );
    let record = consumer.decode(&message).await.unwrap();
    assert_eq!(record.get_str("name"), Some("alice"));
    assert_eq!(record.get_str("favoriteColor"), Some("blue"));
    assert_eq!(record.get_str("favoritePlace"), Some("NYC"));

    let native: v2::User1 = consumer.decode_into(&message).await.unwrap();
    assert_eq!(native.favorite_place, "NYC");
}

#[tokio::test]
async fn test_forward_compatible_decode_drops_unknown_fields() {
    let dir = TempDir::new().unwrap();
    let v1 = schema_file(dir.path(), "user-v1.avsc", USER_V1);
    let v2 = schema_file(dir.path(), "user-v2.avsc", USER_V2);
    let client = InProcessRegistry::new(registry());

    // v1 takes version 1 so the newer writer lands on version 2
    resolver(&client, ResolverConfig::builder().schema_location(&v1).build())
        .encode(&alice())
        .await
        .unwrap();

    let producer = resolver(&client, ResolverConfig::builder().schema_location(&v2).build());
    let message = producer
        .encode(&v2::User1 {
            name: "bob".to_string(),
            favorite_color: "red".to_string(),
            favorite_place: "Boston".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(message.content_type, "application/vnd.user1.v2+avro");

    let consumer = resolver(
        &client,
        ResolverConfig::builder().reader_schema_location(&v1).build(),
    );
    let record = consumer.decode(&message).await.unwrap();
    assert_eq!(record.get_str("name"), Some("bob"));
    assert_eq!(record.get_str("favoriteColor"), Some("red"));
    assert!(record.get("favoritePlace").is_none());

    let native: User1 = consumer.decode_into(&message).await.unwrap();
    assert_eq!(native.name, "bob");
}

#[tokio::test]
async fn test_missing_default_rejects_message() {
    let dir = TempDir::new().unwrap();
    let v1 = schema_file(dir.path(), "user-v1.avsc", USER_V1);
    let strict = schema_file(
        dir.path(),
        "user-strict.avsc",
        &USER_V2.replace(r#", "default": "NYC""#, ""),
    );
    let client = InProcessRegistry::new(registry());

    let message = resolver(&client, ResolverConfig::builder().schema_location(&v1).build())
        .encode(&alice())
        .await
        .unwrap();

    let consumer = resolver(
        &client,
        ResolverConfig::builder().reader_schema_location(&strict).build(),
    );
    match consumer.decode(&message).await {
        Err(ClientError::MissingDefault { field, .. }) => assert_eq!(field, "favoritePlace"),
        other => panic!("expected MissingDefault, got {:?}", other),
    }
}

#[tokio::test]
async fn test_native_decode_without_reader_schema_fails() {
    let dir = TempDir::new().unwrap();
    let v1 = schema_file(dir.path(), "user-v1.avsc", USER_V1);
    let client = InProcessRegistry::new(registry());

    let resolver = resolver(&client, ResolverConfig::builder().schema_location(&v1).build());
    let message = resolver.encode(&alice()).await.unwrap();

    // Generic decoding works with the writer schema alone
    assert_eq!(
        resolver.decode(&message).await.unwrap().get_str("name"),
        Some("alice")
    );
    assert!(matches!(
        resolver.decode_into::<User1>(&message).await,
        Err(ClientError::DecodeConfiguration(_))
    ));
}

#[tokio::test]
async fn test_repeated_registration_reuses_version() {
    let dir = TempDir::new().unwrap();
    let v1 = schema_file(dir.path(), "user-v1.avsc", USER_V1);
    let client = InProcessRegistry::new(registry());

    // Separate resolvers share nothing but the registry
    let first = resolver(&client, ResolverConfig::builder().schema_location(&v1).build())
        .encode(&alice())
        .await
        .unwrap();
    let second = resolver(&client, ResolverConfig::builder().schema_location(&v1).build())
        .encode(&alice())
        .await
        .unwrap();

    assert_eq!(first.content_type, second.content_type);
    assert_eq!(client.registrations(), 2);
}

#[tokio::test]
async fn test_qualified_subject_naming() {
    let dir = TempDir::new().unwrap();
    let v1 = schema_file(dir.path(), "user-v1.avsc", USER_V1);
    let client = InProcessRegistry::new(registry());

    let resolver = resolver(
        &client,
        ResolverConfig::builder()
            .schema_location(&v1)
            .subject_naming_strategy(SubjectNamingStrategyKind::Qualified)
            .build(),
    );
    let message = resolver.encode(&alice()).await.unwrap();
    assert_eq!(
        message.content_type,
        "application/vnd.example.avro.User1.v1+avro"
    );

    let record = resolver.decode(&message).await.unwrap();
    assert_eq!(record.get_str("favoriteColor"), Some("blue"));
}

#[tokio::test]
async fn test_custom_prefix() {
    let dir = TempDir::new().unwrap();
    let v1 = schema_file(dir.path(), "user-v1.avsc", USER_V1);
    let client = InProcessRegistry::new(registry());

    let resolver = resolver(
        &client,
        ResolverConfig::builder().schema_location(&v1).prefix("acme").build(),
    );
    let message = resolver.encode(&alice()).await.unwrap();
    assert_eq!(message.content_type, "application/acme.user1.v1+avro");
    assert!(resolver.decode(&message).await.is_ok());
}

#[derive(Serialize)]
struct Address {
    city: String,
}

#[derive(Serialize)]
struct Customer {
    name: String,
    address: Address,
}

#[tokio::test]
async fn test_schema_imports_and_locations() {
    let dir = TempDir::new().unwrap();
    let address = schema_file(
        dir.path(),
        "address.avsc",
        r#"{"type": "record", "name": "Address", "namespace": "example.avro",
            "fields": [{"name": "city", "type": "string"}]}"#,
    );
    let customer = schema_file(
        dir.path(),
        "customer.avsc",
        r#"{"type": "record", "name": "Customer", "namespace": "example.avro",
            "fields": [
                {"name": "name", "type": "string"},
                {"name": "address", "type": "Address"}
            ]}"#,
    );
    let client = InProcessRegistry::new(registry());

    // Without the import the location does not parse
    assert!(matches!(
        SchemaResolver::new(
            Arc::clone(&client) as Arc<dyn SchemaRegistryClient>,
            ResolverConfig::builder().schema_location(&customer).build(),
        ),
        Err(ClientError::ConfigError(_))
    ));

    let resolver = resolver(
        &client,
        ResolverConfig::builder()
            .schema_import(&address)
            .schema_location(&customer)
            .build(),
    );
    let message = resolver
        .encode(&Customer {
            name: "carol".to_string(),
            address: Address {
                city: "Lisbon".to_string(),
            },
        })
        .await
        .unwrap();
    assert_eq!(message.content_type, "application/vnd.customer.v1+avro");

    let record = resolver.decode(&message).await.unwrap();
    match record.get("address") {
        Some(AvroValue::Record(fields)) => assert_eq!(
            fields[0],
            ("city".to_string(), AvroValue::String("Lisbon".to_string()))
        ),
        other => panic!("expected nested record, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unmapped_type_is_resolution_error() {
    let client = InProcessRegistry::new(registry());
    let resolver = resolver(&client, ResolverConfig::default());

    assert!(matches!(
        resolver.encode(&alice()).await,
        Err(ClientError::SchemaResolutionError(_))
    ));
    assert_eq!(client.registrations(), 0);
}

#[tokio::test]
async fn test_dynamic_schema_generation() {
    let client = InProcessRegistry::new(registry());
    let resolver = resolver(
        &client,
        ResolverConfig::builder().dynamic_schema_generation(true).build(),
    );

    let message = resolver.encode(&alice()).await.unwrap();
    assert_eq!(message.content_type, "application/vnd.user1.v1+avro");

    let record = resolver.decode(&message).await.unwrap();
    assert_eq!(record.get_str("favoriteColor"), Some("blue"));
    assert_eq!(
        record.schema.name().map(|n| n.name.as_str()),
        Some("User1")
    );
}

#[tokio::test]
async fn test_explicit_record_schema() {
    let client = InProcessRegistry::new(registry());
    let resolver = resolver(&client, ResolverConfig::default());

    let schema = Arc::new(AvroSchema::parse_str(USER_V1).unwrap());
    let record = GenericRecord::new(
        Arc::clone(&schema),
        AvroValue::Record(vec![
            ("name".to_string(), AvroValue::String("dave".to_string())),
            ("favoriteColor".to_string(), AvroValue::String("green".to_string())),
        ]),
    );

    let message = resolver.encode_record(&record).await.unwrap();
    assert_eq!(message.content_type, "application/vnd.user1.v1+avro");
    assert_eq!(resolver.decode(&message).await.unwrap(), record);
}

#[tokio::test]
async fn test_shared_named_cache_serves_other_resolvers() {
    let dir = TempDir::new().unwrap();
    let v1 = schema_file(dir.path(), "user-v1.avsc", USER_V1);
    let client = InProcessRegistry::new(registry());
    let manager = SchemaCacheManager::new(CacheSettings::default());

    let producer = SchemaResolver::with_cache_manager(
        Arc::clone(&client) as Arc<dyn SchemaRegistryClient>,
        ResolverConfig::builder().schema_location(&v1).build(),
        &manager,
    )
    .unwrap();
    let consumer = SchemaResolver::with_cache_manager(
        Arc::clone(&client) as Arc<dyn SchemaRegistryClient>,
        ResolverConfig::default(),
        &manager,
    )
    .unwrap();

    let message = producer.encode(&alice()).await.unwrap();
    consumer.decode(&message).await.unwrap();

    // Registration populated the shared cache
    assert_eq!(client.lookups(), 0);
}

#[tokio::test]
async fn test_disabled_cache_reaches_registry_per_message() {
    let dir = TempDir::new().unwrap();
    let v1 = schema_file(dir.path(), "user-v1.avsc", USER_V1);
    let client = InProcessRegistry::new(registry());

    let producer = resolver(&client, ResolverConfig::builder().schema_location(&v1).build());
    let message = producer.encode(&alice()).await.unwrap();

    let consumer = resolver(
        &client,
        ResolverConfig::builder().cache_enabled(false).build(),
    );
    for _ in 0..3 {
        consumer.decode(&message).await.unwrap();
    }
    assert_eq!(client.lookups(), 3);

    let cached = resolver(&client, ResolverConfig::default());
    for _ in 0..3 {
        cached.decode(&message).await.unwrap();
    }
    assert_eq!(client.lookups(), 4);
}

#[tokio::test]
async fn test_decode_each_rejects_only_bad_messages() {
    let dir = TempDir::new().unwrap();
    let v1 = schema_file(dir.path(), "user-v1.avsc", USER_V1);
    let client = InProcessRegistry::new(registry());
    let resolver = resolver(&client, ResolverConfig::builder().schema_location(&v1).build());

    let good = resolver.encode(&alice()).await.unwrap();
    let truncated = Message {
        content_type: good.content_type.clone(),
        payload: good.payload.slice(..2),
    };
    let unknown = Message {
        content_type: "application/vnd.nobody.v1+avro".to_string(),
        payload: good.payload.clone(),
    };

    let results = resolver
        .decode_each(&[truncated, good.clone(), unknown, good])
        .await;
    assert!(matches!(results[0], Err(ClientError::DeserializationError(_))));
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(ClientError::SchemaNotFound(_))));
    assert!(results[3].is_ok());
}
