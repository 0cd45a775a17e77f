//! Core Schema Registry Types

use serde::{Deserialize, Serialize};

/// Compatibility mode for schema evolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompatibilityMode {
    /// No compatibility checking
    #[default]
    None,

    /// New schema can read data written with the latest schema
    Backward,

    /// Latest schema can read data written with the new schema
    Forward,

    /// Both backward and forward compatible
    Full,

    /// Backward compatible with all previous versions
    BackwardTransitive,

    /// Forward compatible with all previous versions
    ForwardTransitive,

    /// Full compatibility with all previous versions
    FullTransitive,
}

impl CompatibilityMode {
    /// Whether the check runs against every stored version instead of the latest one.
    pub fn is_transitive(&self) -> bool {
        matches!(
            self,
            CompatibilityMode::BackwardTransitive
                | CompatibilityMode::ForwardTransitive
                | CompatibilityMode::FullTransitive
        )
    }
}

impl std::str::FromStr for CompatibilityMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(CompatibilityMode::None),
            "BACKWARD" => Ok(CompatibilityMode::Backward),
            "FORWARD" => Ok(CompatibilityMode::Forward),
            "FULL" => Ok(CompatibilityMode::Full),
            "BACKWARD_TRANSITIVE" => Ok(CompatibilityMode::BackwardTransitive),
            "FORWARD_TRANSITIVE" => Ok(CompatibilityMode::ForwardTransitive),
            "FULL_TRANSITIVE" => Ok(CompatibilityMode::FullTransitive),
            other => Err(format!("unknown compatibility mode: {}", other)),
        }
    }
}

/// A stored, immutable schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecord {
    /// Unique schema ID (assigned by the store)
    pub id: i32,

    /// Logical stream/type name
    pub subject: String,

    /// Format name, the validator dispatch key ("avro", "json")
    pub format: String,

    /// Version number, starts at 1 and is contiguous per (subject, format)
    pub version: i32,

    /// Schema text as submitted
    pub definition: String,

    /// Records whose named types this definition imports, in parse order
    #[serde(default)]
    pub references: Vec<SchemaRecord>,
}

impl SchemaRecord {
    pub fn key(&self) -> SchemaKey {
        SchemaKey {
            subject: self.subject.clone(),
            format: self.format.clone(),
            version: self.version,
        }
    }
}

/// A record about to be persisted; the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewSchemaRecord {
    pub subject: String,
    pub format: String,
    pub version: i32,
    pub definition: String,
    pub references: Vec<SchemaRecord>,
}

/// Exact (subject, format, version) coordinates of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaKey {
    pub subject: String,
    pub format: String,
    pub version: i32,
}

impl std::fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/v{}", self.subject, self.format, self.version)
    }
}

/// Schema registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSchemaRequest {
    pub subject: String,

    pub format: String,

    pub definition: String,

    #[serde(default)]
    pub references: Vec<SchemaKey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility_mode_default_is_none() {
        assert_eq!(CompatibilityMode::default(), CompatibilityMode::None);
    }

    #[test]
    fn test_compatibility_mode_serialize_all_variants() {
        let expected = vec![
            (CompatibilityMode::None, r#""NONE""#),
            (CompatibilityMode::Backward, r#""BACKWARD""#),
            (CompatibilityMode::Forward, r#""FORWARD""#),
            (CompatibilityMode::Full, r#""FULL""#),
            (CompatibilityMode::BackwardTransitive, r#""BACKWARD_TRANSITIVE""#),
            (CompatibilityMode::ForwardTransitive, r#""FORWARD_TRANSITIVE""#),
            (CompatibilityMode::FullTransitive, r#""FULL_TRANSITIVE""#),
        ];
        for (mode, expected_json) in expected {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, expected_json, "Failed for {:?}", mode);
        }
    }

    #[test]
    fn test_compatibility_mode_from_str() {
        assert_eq!(
            "backward_transitive".parse::<CompatibilityMode>().unwrap(),
            CompatibilityMode::BackwardTransitive
        );
        assert_eq!(" full ".parse::<CompatibilityMode>().unwrap(), CompatibilityMode::Full);
        assert!("sideways".parse::<CompatibilityMode>().is_err());
    }

    #[test]
    fn test_compatibility_mode_transitive() {
        assert!(CompatibilityMode::FullTransitive.is_transitive());
        assert!(!CompatibilityMode::Full.is_transitive());
        assert!(!CompatibilityMode::None.is_transitive());
    }

    #[test]
    fn test_register_request_references_default_to_empty() {
        let json = r#"{"subject": "user", "format": "avro", "definition": "\"string\""}"#;
        let request: RegisterSchemaRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.subject, "user");
        assert_eq!(request.format, "avro");
        assert!(request.references.is_empty());
    }

    #[test]
    fn test_schema_record_serde_includes_nested_references() {
        let dep = SchemaRecord {
            id: 1,
            subject: "address".to_string(),
            format: "avro".to_string(),
            version: 1,
            definition: "{}".to_string(),
            references: vec![],
        };
        let record = SchemaRecord {
            id: 2,
            subject: "user".to_string(),
            format: "avro".to_string(),
            version: 3,
            definition: "{}".to_string(),
            references: vec![dep.clone()],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["references"][0]["subject"], "address");

        let back: SchemaRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_schema_key_display() {
        let key = SchemaKey {
            subject: "user".to_string(),
            format: "avro".to_string(),
            version: 2,
        };
        assert_eq!(key.to_string(), "user/avro/v2");
    }
}
