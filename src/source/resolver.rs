//! Resource resolution
//!
//! Identifiers resolve against packaged resources first (documents compiled
//! into the binary) and then against the filesystem. Relative filesystem
//! paths are taken relative to the configured base directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{DefsError, DefsResult};
use crate::schema::PACKAGED_CONTRACTS;

/// Where a resolved resource came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Packaged,
    File(PathBuf),
}

/// A resolved resource and its text content.
#[derive(Debug, Clone)]
pub struct Resource {
    pub id: String,
    pub origin: Origin,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ResourceResolver {
    packaged: HashMap<String, String>,
    base_dir: Option<PathBuf>,
}

impl ResourceResolver {
    /// Creates a resolver holding the packaged schema contracts.
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        let packaged = PACKAGED_CONTRACTS
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();
        Self { packaged, base_dir }
    }

    /// Registers an additional packaged resource.
    pub fn with_packaged(mut self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.packaged.insert(id.into(), content.into());
        self
    }

    /// Returns true if `id` names a packaged resource.
    pub fn is_packaged(&self, id: &str) -> bool {
        self.packaged.contains_key(id)
    }

    /// Resolves a filesystem path against the base directory.
    pub fn fs_path(&self, id: &str) -> PathBuf {
        let path = Path::new(id);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Reads a resource, packaged resources taking precedence.
    pub fn read(&self, id: &str) -> DefsResult<Resource> {
        if let Some(content) = self.packaged.get(id) {
            return Ok(Resource {
                id: id.to_string(),
                origin: Origin::Packaged,
                content: content.clone(),
            });
        }

        let path = self.fs_path(id);
        let content = fs::read_to_string(&path)
            .map_err(|e| DefsError::source_not_found(id, e.to_string()))?;
        Ok(Resource {
            id: id.to_string(),
            origin: Origin::File(path),
            content,
        })
    }

    /// Lists regular files under `dir` (recursively) whose extension is one
    /// of `extensions`, sorted by path. Returned paths are ids: relative to
    /// the base directory when under it.
    pub fn list_files(&self, dir: &str, extensions: &[&str]) -> DefsResult<Vec<PathBuf>> {
        let root = self.fs_path(dir);
        if !root.is_dir() {
            return Err(DefsError::source_not_found(dir, "not a directory"));
        }

        let mut files = Vec::new();
        let mut pending = vec![root];
        while let Some(current) = pending.pop() {
            let entries = fs::read_dir(&current)
                .map_err(|e| DefsError::source_not_found(current.display().to_string(), e.to_string()))?;
            for entry in entries {
                let path = entry
                    .map_err(|e| DefsError::source_not_found(current.display().to_string(), e.to_string()))?
                    .path();
                if path.is_dir() {
                    pending.push(path);
                } else if path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| extensions.contains(&ext))
                {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files.into_iter().map(|path| self.to_id(path)).collect())
    }

    /// Inverse of `fs_path` for paths under the base directory.
    fn to_id(&self, path: PathBuf) -> PathBuf {
        match &self.base_dir {
            Some(base) => path
                .strip_prefix(base)
                .map(Path::to_path_buf)
                .unwrap_or(path),
            None => path,
        }
    }
}
