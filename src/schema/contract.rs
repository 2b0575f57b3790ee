//! Schema contracts
//!
//! A contract is a named, versioned JSON Schema document compiled once into a
//! reusable validator. Two contracts ship inside the binary:
//! - `defined`: applies to raw author input
//! - `effective`: applies to fully normalized output

use std::fmt;

use serde_json::Value;

use crate::errors::{DefsError, DefsResult};

/// Contracts compiled into the binary, by name.
pub const PACKAGED_CONTRACTS: &[(&str, &str)] = &[
    ("defined", include_str!("../../schemas/defined.json")),
    ("effective", include_str!("../../schemas/effective.json")),
];

const UNVERSIONED: &str = "unversioned";

pub struct SchemaContract {
    name: String,
    version: String,
    document: Value,
    validator: jsonschema::Validator,
}

impl SchemaContract {
    /// Compiles a schema document into a contract.
    ///
    /// The contract version is read from the document's top-level `version`
    /// keyword when present.
    pub fn compile(name: impl Into<String>, document: Value) -> DefsResult<Self> {
        let name = name.into();
        let validator = jsonschema::validator_for(&document)
            .map_err(|e| DefsError::malformed(&name, format!("invalid schema: {}", e)))?;
        let version = document
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or(UNVERSIONED)
            .to_string();

        Ok(Self {
            name,
            version,
            document,
            validator,
        })
    }

    /// Parses and compiles a JSON schema text.
    pub fn from_json_str(name: impl Into<String>, json: &str) -> DefsResult<Self> {
        let name = name.into();
        let document: Value =
            serde_json::from_str(json).map_err(|e| DefsError::malformed(&name, e))?;
        Self::compile(name, document)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[inline]
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub(crate) fn validator(&self) -> &jsonschema::Validator {
        &self.validator
    }
}

impl fmt::Debug for SchemaContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaContract")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_packaged_contracts_compile() {
        for (name, text) in PACKAGED_CONTRACTS {
            let contract = SchemaContract::from_json_str(*name, text).unwrap();
            assert_eq!(contract.name(), *name);
            assert_eq!(contract.version(), "1");
        }
    }

    #[test]
    fn test_version_defaults_when_absent() {
        let contract = SchemaContract::compile("plain", json!({ "type": "object" })).unwrap();
        assert_eq!(contract.version(), "unversioned");
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let err = SchemaContract::compile("broken", json!({ "type": 12 })).unwrap_err();
        assert_eq!(err.code(), "DEFS_MALFORMED_SOURCE");
    }

    #[test]
    fn test_non_json_rejected() {
        let err = SchemaContract::from_json_str("broken", "{ not json").unwrap_err();
        assert_eq!(err.code(), "DEFS_MALFORMED_SOURCE");
    }
}
