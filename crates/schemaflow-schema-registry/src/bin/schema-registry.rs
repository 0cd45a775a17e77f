//! schemaflow Schema Registry Server
//!
//! Standalone schema registry server with REST API, backed by the in-memory
//! store.
//!
//! # Environment Variables
//!
//! - `SCHEMA_REGISTRY_ADDR`: listen address (default: 0.0.0.0:8990)
//! - `SCHEMA_REGISTRY_ALLOW_DELETION`: enable DELETE endpoints (default: false)
//! - `SCHEMA_REGISTRY_COMPATIBILITY`: compatibility mode (default: NONE)
//! - `RUST_LOG`: Log level (default: info)
//!
//! # Example
//!
//! ```bash
//! export SCHEMA_REGISTRY_ADDR=127.0.0.1:8990
//! export SCHEMA_REGISTRY_ALLOW_DELETION=true
//! cargo run --bin schema-registry
//! ```

use schemaflow_schema_registry::{
    MemorySchemaStore, RegistryConfig, SchemaRegistry, SchemaRegistryApi, ValidatorRegistry,
};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    let log_level = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info".to_string())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("schemaflow Schema Registry starting...");

    let config = RegistryConfig::from_env()?;
    let validators = ValidatorRegistry::with_defaults();

    info!("Configuration:");
    info!("  Address: {}", config.bind_addr);
    info!("  Schema deletion allowed: {}", config.allow_schema_deletion);
    info!("  Compatibility: {:?}", config.compatibility);
    info!("  Formats: {}", validators.formats().join(", "));

    let addr = config.bind_addr.clone();
    let store = Arc::new(MemorySchemaStore::new());
    let registry = Arc::new(SchemaRegistry::new(store, validators, config));

    let api = SchemaRegistryApi::new(registry);
    info!("  Health: http://{}/health", addr);

    api.serve(&addr).await?;

    Ok(())
}
