//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero exit code.

use std::fmt;
use std::io;

use crate::errors::DefsError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// Requested DataDef or version does not exist
    NotFound,
    /// Pipeline or store failure
    DefsFailed,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "SCRAPEDEF_CLI_CONFIG_ERROR",
            Self::IoError => "SCRAPEDEF_CLI_IO_ERROR",
            Self::NotFound => "SCRAPEDEF_CLI_NOT_FOUND",
            Self::DefsFailed => "SCRAPEDEF_CLI_DEFS_FAILED",
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::NotFound, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<DefsError> for CliError {
    fn from(e: DefsError) -> Self {
        if let DefsError::Config(msg) = &e {
            return Self::config_error(msg.clone());
        }
        let mut message = format!("[{}] {}", e.code(), e);
        for violation in e.violations() {
            message.push_str(&format!("\n  - {}", violation));
        }
        Self::new(CliErrorCode::DefsFailed, message)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Violation;

    #[test]
    fn test_config_error_keeps_config_code() {
        let err = CliError::from(DefsError::Config("defs_dir must not be empty".into()));
        assert_eq!(err.code_str(), "SCRAPEDEF_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_violations_listed() {
        let err = CliError::from(DefsError::SchemaValidation {
            contract: "defined".into(),
            violations: vec![Violation::new("/dataDefs/price", "\"axis\" is a required property")],
        });
        assert_eq!(err.code_str(), "SCRAPEDEF_CLI_DEFS_FAILED");
        assert!(err.message().contains("DEFS_SCHEMA_VALIDATION_FAILED"));
        assert!(err.message().contains("/dataDefs/price"));
    }
}
