//! Server configuration
//!
//! # Environment Variables
//!
//! - `SCHEMA_REGISTRY_ADDR`: listen address (default: 0.0.0.0:8990)
//! - `SCHEMA_REGISTRY_ALLOW_DELETION`: enable the DELETE endpoints (default: false)
//! - `SCHEMA_REGISTRY_COMPATIBILITY`: compatibility mode for new versions (default: NONE)

use crate::{
    error::{Result, SchemaError},
    types::CompatibilityMode,
};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8990";

/// Registry server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Address the HTTP API listens on
    pub bind_addr: String,

    /// When false every delete request fails with `SchemaDeletionNotAllowed`
    pub allow_schema_deletion: bool,

    /// Checked whenever a registration mints a new version
    pub compatibility: CompatibilityMode,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            allow_schema_deletion: false,
            compatibility: CompatibilityMode::None,
        }
    }
}

impl RegistryConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("SCHEMA_REGISTRY_ADDR") {
            config.bind_addr = addr;
        }

        if let Some(flag) = lookup("SCHEMA_REGISTRY_ALLOW_DELETION") {
            config.allow_schema_deletion = flag.trim().parse::<bool>().map_err(|_| {
                SchemaError::InvalidRequest(format!(
                    "SCHEMA_REGISTRY_ALLOW_DELETION must be true or false, got '{}'",
                    flag
                ))
            })?;
        }

        if let Some(mode) = lookup("SCHEMA_REGISTRY_COMPATIBILITY") {
            config.compatibility = mode.parse().map_err(SchemaError::InvalidRequest)?;
        }

        Ok(config)
    }

    pub fn with_schema_deletion(mut self, allow: bool) -> Self {
        self.allow_schema_deletion = allow;
        self
    }

    pub fn with_compatibility(mut self, mode: CompatibilityMode) -> Self {
        self.compatibility = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.bind_addr, "0.0.0.0:8990");
        assert!(!config.allow_schema_deletion);
        assert_eq!(config.compatibility, CompatibilityMode::None);
    }

    #[test]
    fn test_overrides() {
        let config = RegistryConfig::from_lookup(lookup_from(&[
            ("SCHEMA_REGISTRY_ADDR", "127.0.0.1:9000"),
            ("SCHEMA_REGISTRY_ALLOW_DELETION", "true"),
            ("SCHEMA_REGISTRY_COMPATIBILITY", "backward"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert!(config.allow_schema_deletion);
        assert_eq!(config.compatibility, CompatibilityMode::Backward);
    }

    #[test]
    fn test_bad_values_rejected() {
        let err = RegistryConfig::from_lookup(lookup_from(&[(
            "SCHEMA_REGISTRY_ALLOW_DELETION",
            "yes please",
        )]))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidRequest(_)));

        assert!(RegistryConfig::from_lookup(lookup_from(&[(
            "SCHEMA_REGISTRY_COMPATIBILITY",
            "sideways"
        )]))
        .is_err());
    }
}
