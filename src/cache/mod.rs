//! Extracted-artifact cache
//!
//! Artifacts are addressed by a pair of fingerprints: a directory scope
//! (typically the locator) and a file scope (typically the document). On
//! disk each artifact is one envelope at `<root>/<dir>/data-<file>` holding
//! the payload, its CRC32 and free-form metadata.
//!
//! The compiler never consults the cache. Extraction steps do.

mod checksum;
mod fingerprint;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::durable;
use crate::errors::{DefsError, DefsResult};
use crate::observability::{log_event_with_fields, Event};

pub use checksum::{compute_checksum, verify_checksum};
pub use fingerprint::Fingerprint;

const FILE_PREFIX: &str = "data-";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub dir: Fingerprint,
    pub file: Fingerprint,
}

impl ArtifactKey {
    pub fn new(dir: Fingerprint, file: Fingerprint) -> Self {
        Self { dir, file }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.dir, FILE_PREFIX, self.file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Artifact {
    pub payload: String,
    pub metadata: BTreeMap<String, String>,
}

impl Artifact {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait ArtifactCache {
    /// `None` if nothing is cached under `key`.
    fn get(&self, key: &ArtifactKey) -> DefsResult<Option<Artifact>>;

    fn save(&self, key: &ArtifactKey, artifact: &Artifact) -> DefsResult<()>;

    /// Returns whether an entry was removed.
    fn delete(&self, key: &ArtifactKey) -> DefsResult<bool>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    checksum: u32,
    saved_at: DateTime<Utc>,
    metadata: BTreeMap<String, String>,
    payload: String,
}

#[derive(Debug, Clone)]
pub struct FsArtifactCache {
    root: PathBuf,
}

impl FsArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, key: &ArtifactKey) -> PathBuf {
        self.root
            .join(key.dir.as_str())
            .join(format!("{}{}", FILE_PREFIX, key.file))
    }

    fn integrity_failure(key: &ArtifactKey, reason: &str) -> DefsError {
        let key = key.to_string();
        log_event_with_fields(
            Event::ArtifactIntegrityFailure,
            &[("key", key.as_str()), ("reason", reason)],
        );
        DefsError::IntegrityFailure { key }
    }
}

impl ArtifactCache for FsArtifactCache {
    fn get(&self, key: &ArtifactKey) -> DefsResult<Option<Artifact>> {
        let Some(bytes) = durable::read_optional(&self.path_of(key))? else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_slice(&bytes)
            .map_err(|e| Self::integrity_failure(key, &e.to_string()))?;
        if !verify_checksum(envelope.payload.as_bytes(), envelope.checksum) {
            return Err(Self::integrity_failure(key, "checksum mismatch"));
        }
        Ok(Some(Artifact {
            payload: envelope.payload,
            metadata: envelope.metadata,
        }))
    }

    fn save(&self, key: &ArtifactKey, artifact: &Artifact) -> DefsResult<()> {
        let envelope = Envelope {
            checksum: compute_checksum(artifact.payload.as_bytes()),
            saved_at: Utc::now(),
            metadata: artifact.metadata.clone(),
            payload: artifact.payload.clone(),
        };
        let bytes = serde_json::to_vec(&envelope)?;
        durable::write_atomic(&self.path_of(key), &bytes)?;

        let key = key.to_string();
        let size = bytes.len().to_string();
        log_event_with_fields(Event::ArtifactSaved, &[("key", key.as_str()), ("bytes", size.as_str())]);
        Ok(())
    }

    fn delete(&self, key: &ArtifactKey) -> DefsResult<bool> {
        match fs::remove_file(self.path_of(key)) {
            Ok(()) => {
                debug!(key = %key, "artifact deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key() -> ArtifactKey {
        ArtifactKey::new(
            Fingerprint::of(["https://example.org/quote"]),
            Fingerprint::of(["acme", "2024-01-01"]),
        )
    }

    #[test]
    fn test_save_get_delete() {
        let dir = TempDir::new().unwrap();
        let cache = FsArtifactCache::new(dir.path());
        let artifact = Artifact::new(r#"{"price":"10.5"}"#).with_metadata("dataDef", "acme");

        assert!(cache.get(&key()).unwrap().is_none());
        cache.save(&key(), &artifact).unwrap();
        assert_eq!(cache.get(&key()).unwrap(), Some(artifact));

        let path = cache.path_of(&key());
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .starts_with("data-"));

        assert!(cache.delete(&key()).unwrap());
        assert!(!cache.delete(&key()).unwrap());
        assert!(cache.get(&key()).unwrap().is_none());
    }

    #[test]
    fn test_tampered_payload_is_integrity_failure() {
        let dir = TempDir::new().unwrap();
        let cache = FsArtifactCache::new(dir.path());
        cache.save(&key(), &Artifact::new("original")).unwrap();

        let path = cache.path_of(&key());
        let tampered = fs::read_to_string(&path).unwrap().replace("original", "modified");
        fs::write(&path, tampered).unwrap();

        let err = cache.get(&key()).unwrap_err();
        assert_eq!(err.code(), "DEFS_INTEGRITY_FAILURE");
    }

    #[test]
    fn test_garbled_envelope_is_integrity_failure() {
        let dir = TempDir::new().unwrap();
        let cache = FsArtifactCache::new(dir.path());
        let path = cache.path_of(&key());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not json").unwrap();

        assert_eq!(cache.get(&key()).unwrap_err().code(), "DEFS_INTEGRITY_FAILURE");
    }
}
