//! Client-side schema caching
//!
//! [`SchemaCache`] is a switch between a bounded moka cache and a no-op
//! cache that sends every lookup through to its loader. Concurrent misses
//! for the same key on an enabled cache share one load.
//!
//! [`SchemaCacheManager`] hands out caches by name so several clients in a
//! process can share one, and [`CachingSchemaRegistryClient`] puts a cache in
//! front of any [`SchemaRegistryClient`].

use crate::{
    config::CacheSettings,
    error::{ClientError, Result},
    registry_client::{RegisteredSchema, SchemaRegistryClient},
};
use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// Bounded cache that can be switched off
#[derive(Clone)]
pub enum SchemaCache<K, V> {
    Enabled(Cache<K, V>),
    Disabled,
}

impl<K, V> SchemaCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Enabled cache holding at most `max_capacity` entries
    pub fn new(max_capacity: u64, time_to_live: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(max_capacity);
        if let Some(ttl) = time_to_live {
            builder = builder.time_to_live(ttl);
        }
        SchemaCache::Enabled(builder.build())
    }

    /// Cache described by `settings`
    pub fn from_settings(settings: &CacheSettings) -> Self {
        if settings.enabled {
            Self::new(settings.max_capacity, settings.time_to_live())
        } else {
            SchemaCache::Disabled
        }
    }

    pub fn disabled() -> Self {
        SchemaCache::Disabled
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, SchemaCache::Enabled(_))
    }

    /// Cached value for `key`, or the result of `load`.
    ///
    /// Failed loads are not cached.
    pub async fn get_or_load<F>(&self, key: K, load: F) -> Result<V>
    where
        F: Future<Output = Result<V>>,
    {
        match self {
            SchemaCache::Enabled(cache) => cache
                .try_get_with(key, load)
                .await
                .map_err(|e: Arc<ClientError>| (*e).clone()),
            SchemaCache::Disabled => load.await,
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        match self {
            SchemaCache::Enabled(cache) => cache.get(key).await,
            SchemaCache::Disabled => None,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        if let SchemaCache::Enabled(cache) = self {
            cache.insert(key, value).await;
        }
    }
}

/// Lookup key for registry responses
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaCacheKey {
    Id(i32),
    Version {
        subject: String,
        format: String,
        version: i32,
    },
}

impl SchemaCacheKey {
    pub fn version(subject: &str, format: &str, version: i32) -> Self {
        SchemaCacheKey::Version {
            subject: subject.to_string(),
            format: format.to_string(),
            version,
        }
    }
}

/// Cache of registry responses
pub type RegistryCache = SchemaCache<SchemaCacheKey, RegisteredSchema>;

/// Named registry caches
///
/// Every cache handed out shares the manager's settings. With caching
/// disabled every name maps to a no-op cache.
pub struct SchemaCacheManager {
    settings: CacheSettings,
    caches: DashMap<String, RegistryCache>,
}

impl SchemaCacheManager {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            caches: DashMap::new(),
        }
    }

    /// Manager that only hands out no-op caches
    pub fn disabled() -> Self {
        Self::new(CacheSettings {
            enabled: false,
            ..CacheSettings::default()
        })
    }

    /// Cache registered under `name`, created on first request
    pub fn cache(&self, name: &str) -> RegistryCache {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(cache = name, enabled = self.settings.enabled, "Creating schema cache");
                RegistryCache::from_settings(&self.settings)
            })
            .clone()
    }

    /// Names of the caches created so far
    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// Registry client that serves lookups by id and by exact version from a
/// cache. Latest-version lookups always reach the registry, and their
/// results are cached under their exact keys.
pub struct CachingSchemaRegistryClient {
    inner: Arc<dyn SchemaRegistryClient>,
    cache: RegistryCache,
}

impl CachingSchemaRegistryClient {
    pub fn new(inner: Arc<dyn SchemaRegistryClient>, cache: RegistryCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &RegistryCache {
        &self.cache
    }

    async fn remember(&self, schema: &RegisteredSchema) {
        self.cache
            .insert(SchemaCacheKey::Id(schema.id), schema.clone())
            .await;
        self.cache
            .insert(
                SchemaCacheKey::version(&schema.subject, &schema.format, schema.version),
                schema.clone(),
            )
            .await;
    }
}

#[async_trait]
impl SchemaRegistryClient for CachingSchemaRegistryClient {
    async fn register(
        &self,
        subject: &str,
        format: &str,
        definition: &str,
    ) -> Result<RegisteredSchema> {
        let schema = self.inner.register(subject, format, definition).await?;
        self.remember(&schema).await;
        Ok(schema)
    }

    async fn fetch_by_id(&self, id: i32) -> Result<RegisteredSchema> {
        self.cache
            .get_or_load(SchemaCacheKey::Id(id), self.inner.fetch_by_id(id))
            .await
    }

    async fn fetch(&self, subject: &str, format: &str, version: i32) -> Result<RegisteredSchema> {
        self.cache
            .get_or_load(
                SchemaCacheKey::version(subject, format, version),
                self.inner.fetch(subject, format, version),
            )
            .await
    }

    async fn fetch_latest(&self, subject: &str, format: &str) -> Result<RegisteredSchema> {
        let schema = self.inner.fetch_latest(subject, format).await?;
        self.remember(&schema).await;
        Ok(schema)
    }
}
