//! Compiler configuration
//!
//! One explicit struct, loaded from a JSON or YAML file and threaded into each
//! component at construction. Components never read configuration on their
//! own.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DefsError, DefsResult};
use crate::schema::ViolationPolicy;

/// Step group attached to tasks that declare no steps of their own.
pub const DEFAULT_STEPS_NAME: &str = "jsoupDefault";

/// Name of the packaged contract for author input.
pub const DEFINED_SCHEMA: &str = "defined";

/// Name of the packaged contract for normalized output.
pub const EFFECTIVE_SCHEMA: &str = "effective";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Directory holding the definition documents (required)
    pub defs_dir: PathBuf,

    /// Document providing the default step groups
    #[serde(default)]
    pub default_steps_file: Option<PathBuf>,

    /// Group attached to tasks without steps
    #[serde(default = "default_steps_name")]
    pub default_steps_name: String,

    /// Contract applied before normalization
    #[serde(default = "default_defined_schema")]
    pub defined_schema: String,

    /// Contract applied after normalization
    #[serde(default = "default_effective_schema")]
    pub effective_schema: String,

    /// Whether validation reports every violation or only the first
    #[serde(default)]
    pub violation_policy: ViolationPolicy,

    /// Sentinel `to_date` of currently active versions
    #[serde(default = "default_high_date")]
    pub high_date: DateTime<Utc>,

    /// Directory of the persisted DataDef store
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Directory of the extracted-artifact cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Attempts per name when the store reports a concurrent write
    #[serde(default = "default_reconcile_retries")]
    pub reconcile_retries: u32,

    /// Wait before the first retry, doubled per further attempt
    #[serde(default = "default_reconcile_backoff_ms")]
    pub reconcile_backoff_ms: u64,

    /// Base for relative resource paths (defaults to the config file's directory)
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

fn default_steps_name() -> String {
    DEFAULT_STEPS_NAME.to_string()
}
fn default_defined_schema() -> String {
    DEFINED_SCHEMA.to_string()
}
fn default_effective_schema() -> String {
    EFFECTIVE_SCHEMA.to_string()
}
fn default_high_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2037, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
fn default_store_dir() -> PathBuf {
    PathBuf::from("data/datadefs")
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/artifacts")
}
fn default_reconcile_retries() -> u32 {
    3
}
fn default_reconcile_backoff_ms() -> u64 {
    10
}

impl CompilerConfig {
    /// Creates a configuration with defaults for everything but the defs directory.
    pub fn new(defs_dir: impl Into<PathBuf>) -> Self {
        Self {
            defs_dir: defs_dir.into(),
            default_steps_file: None,
            default_steps_name: default_steps_name(),
            defined_schema: default_defined_schema(),
            effective_schema: default_effective_schema(),
            violation_policy: ViolationPolicy::default(),
            high_date: default_high_date(),
            store_dir: default_store_dir(),
            cache_dir: default_cache_dir(),
            reconcile_retries: default_reconcile_retries(),
            reconcile_backoff_ms: default_reconcile_backoff_ms(),
            base_dir: None,
        }
    }

    /// Loads configuration from a `.json`, `.yml` or `.yaml` file.
    pub fn load(path: &Path) -> DefsResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DefsError::Config(format!("failed to read config '{}': {}", path.display(), e))
        })?;

        let is_json = path.extension().map_or(false, |ext| ext == "json");
        let mut config: CompilerConfig = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| DefsError::Config(format!("invalid config JSON: {}", e)))?
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| DefsError::Config(format!("invalid config YAML: {}", e)))?
        };

        if config.base_dir.is_none() {
            config.base_dir = path.parent().map(Path::to_path_buf);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values.
    pub fn validate(&self) -> DefsResult<()> {
        if self.defs_dir.as_os_str().is_empty() {
            return Err(DefsError::Config("defs_dir must not be empty".into()));
        }
        if self.default_steps_name.trim().is_empty() {
            return Err(DefsError::Config("default_steps_name must not be empty".into()));
        }
        if self.defined_schema.is_empty() || self.effective_schema.is_empty() {
            return Err(DefsError::Config("schema names must not be empty".into()));
        }
        if self.reconcile_retries == 0 {
            return Err(DefsError::Config("reconcile_retries must be > 0".into()));
        }
        Ok(())
    }

    /// Resolves a possibly relative path against `base_dir`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_applied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scrapedef.json");
        fs::write(&path, r#"{ "defs_dir": "defs" }"#).unwrap();

        let config = CompilerConfig::load(&path).unwrap();
        assert_eq!(config.default_steps_name, "jsoupDefault");
        assert_eq!(config.defined_schema, "defined");
        assert_eq!(config.effective_schema, "effective");
        assert_eq!(config.violation_policy, ViolationPolicy::CollectAll);
        assert_eq!(config.reconcile_retries, 3);
        assert_eq!(config.reconcile_backoff_ms, 10);
        assert_eq!(config.high_date.to_rfc3339(), "2037-12-31T23:59:59+00:00");
        assert_eq!(config.base_dir.as_deref(), Some(dir.path()));
        assert_eq!(config.resolve(&config.defs_dir), dir.path().join("defs"));
    }

    #[test]
    fn test_yaml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scrapedef.yml");
        fs::write(
            &path,
            "defs_dir: /abs/defs\ndefault_steps_name: custom\nviolation_policy: fail_fast\n",
        )
        .unwrap();

        let config = CompilerConfig::load(&path).unwrap();
        assert_eq!(config.default_steps_name, "custom");
        assert_eq!(config.violation_policy, ViolationPolicy::FailFast);
        assert_eq!(config.resolve(&config.defs_dir), PathBuf::from("/abs/defs"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scrapedef.json");
        fs::write(&path, r#"{ "defs_dir": "defs", "defsDir": "x" }"#).unwrap();

        let err = CompilerConfig::load(&path).unwrap_err();
        assert_eq!(err.code(), "DEFS_CONFIG_INVALID");
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut config = CompilerConfig::new("defs");
        config.reconcile_retries = 0;
        assert!(config.validate().is_err());
    }
}
