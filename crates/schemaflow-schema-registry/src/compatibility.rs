//! Schema Compatibility Checking
//!
//! Validates that schema evolution follows the configured compatibility mode.
//! The per-format reader/writer rule lives in each validator's `can_read`.

use crate::{
    error::{Result, SchemaError},
    types::{CompatibilityMode, SchemaRecord},
    validator::SchemaValidator,
};

/// Check a candidate against the existing versions (ascending by version).
pub fn check_compatibility(
    validator: &dyn SchemaValidator,
    mode: CompatibilityMode,
    existing: &[SchemaRecord],
    candidate: &SchemaRecord,
) -> Result<()> {
    if mode == CompatibilityMode::None {
        return Ok(());
    }

    let targets: &[SchemaRecord] = if mode.is_transitive() {
        existing
    } else {
        match existing.last() {
            Some(_) => &existing[existing.len() - 1..],
            None => &[],
        }
    };

    for target in targets {
        let compatible = match mode {
            // New schema can read data written with old schema
            CompatibilityMode::Backward | CompatibilityMode::BackwardTransitive => {
                validator.can_read(candidate, target)?
            }
            // Old schema can read data written with new schema
            CompatibilityMode::Forward | CompatibilityMode::ForwardTransitive => {
                validator.can_read(target, candidate)?
            }
            CompatibilityMode::Full | CompatibilityMode::FullTransitive => {
                validator.can_read(candidate, target)? && validator.can_read(target, candidate)?
            }
            CompatibilityMode::None => true,
        };

        if !compatible {
            return Err(SchemaError::IncompatibleSchema(format!(
                "New schema is not compatible with version {} under {:?} mode",
                target.version, mode
            )));
        }
    }

    Ok(())
}
