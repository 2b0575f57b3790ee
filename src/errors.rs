//! Error types for the definition compiler
//!
//! Error codes:
//! - DEFS_SOURCE_NOT_FOUND (FATAL)
//! - DEFS_MALFORMED_SOURCE (FATAL)
//! - DEFS_SCHEMA_VALIDATION_FAILED (FATAL)
//! - DEFS_CYCLIC_STEP_REFERENCE (FATAL)
//! - DEFS_DEFINITION_NOT_FOUND (FATAL)
//! - DEFS_QUERY_NOT_FOUND (FATAL)
//! - DEFS_INVALID_VALIDITY (FATAL)
//! - DEFS_CONCURRENT_MODIFICATION (RETRYABLE)
//! - DEFS_INTEGRITY_FAILURE (FATAL)
//! - DEFS_STORE_FAILED (FATAL)
//! - DEFS_CONFIG_INVALID (FATAL)
//!
//! Every failure except `ConcurrentModification` aborts the current
//! compilation run. No partial output is ever returned alongside an error.

use std::fmt;

use thiserror::Error;

/// Result type for compiler operations
pub type DefsResult<T> = Result<T, DefsError>;

/// A single violated schema constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer of the offending node (`""` for the root)
    pub path: String,
    /// Human-readable description of the violated constraint
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "at '{}': {}", path, self.message)
    }
}

/// Compiler errors
#[derive(Debug, Clone, Error)]
pub enum DefsError {
    #[error("source not found: {id} ({reason})")]
    SourceNotFound { id: String, reason: String },

    #[error("malformed source '{id}': {diagnostic}")]
    MalformedSource { id: String, diagnostic: String },

    #[error("schema '{contract}' rejected tree with {} violation(s): {}", violations.len(), join_violations(violations))]
    SchemaValidation {
        contract: String,
        violations: Vec<Violation>,
    },

    #[error("cyclic step reference: {}", chain.join(" -> "))]
    CyclicStepReference { chain: Vec<String> },

    #[error("{kind} not found: {name}")]
    DefinitionNotFound { kind: String, name: String },

    #[error("query not found for [{key}]")]
    QueryNotFound { key: String },

    #[error("invalid validity window for '{name}': {reason}")]
    InvalidValidity { name: String, reason: String },

    #[error("concurrent modification of '{name}'")]
    ConcurrentModification { name: String },

    #[error("integrity check failed for {key}")]
    IntegrityFailure { key: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DefsError {
    pub fn source_not_found(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceNotFound {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(id: impl Into<String>, diagnostic: impl ToString) -> Self {
        Self::MalformedSource {
            id: id.into(),
            diagnostic: diagnostic.to_string(),
        }
    }

    pub fn definition_not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DefinitionNotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            DefsError::SourceNotFound { .. } => "DEFS_SOURCE_NOT_FOUND",
            DefsError::MalformedSource { .. } => "DEFS_MALFORMED_SOURCE",
            DefsError::SchemaValidation { .. } => "DEFS_SCHEMA_VALIDATION_FAILED",
            DefsError::CyclicStepReference { .. } => "DEFS_CYCLIC_STEP_REFERENCE",
            DefsError::DefinitionNotFound { .. } => "DEFS_DEFINITION_NOT_FOUND",
            DefsError::QueryNotFound { .. } => "DEFS_QUERY_NOT_FOUND",
            DefsError::InvalidValidity { .. } => "DEFS_INVALID_VALIDITY",
            DefsError::ConcurrentModification { .. } => "DEFS_CONCURRENT_MODIFICATION",
            DefsError::IntegrityFailure { .. } => "DEFS_INTEGRITY_FAILURE",
            DefsError::Store(_) => "DEFS_STORE_FAILED",
            DefsError::Config(_) => "DEFS_CONFIG_INVALID",
        }
    }

    /// Whether re-attempting the operation may succeed.
    ///
    /// Only a lost race at the store boundary is recoverable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DefsError::ConcurrentModification { .. })
    }

    /// Returns the violations of a schema validation failure, if any.
    pub fn violations(&self) -> &[Violation] {
        match self {
            DefsError::SchemaValidation { violations, .. } => violations,
            _ => &[],
        }
    }
}

impl From<std::io::Error> for DefsError {
    fn from(e: std::io::Error) -> Self {
        DefsError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for DefsError {
    fn from(e: serde_json::Error) -> Self {
        DefsError::Store(format!("JSON error: {}", e))
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
