//! Source loading and merging
//!
//! Reads definition documents, parses them, and deep-merges them left to right
//! into one defined tree.

use tracing::{debug, info};

use super::resolver::ResourceResolver;
use crate::errors::{DefsError, DefsResult};
use crate::tree::{merge_all, DefNode};

/// File extensions recognised as definition documents.
pub const DEFS_EXTENSIONS: &[&str] = &["yml", "yaml"];

/// Loads and merges definition documents.
pub struct SourceLoader<'a> {
    resolver: &'a ResourceResolver,
}

impl<'a> SourceLoader<'a> {
    pub fn new(resolver: &'a ResourceResolver) -> Self {
        Self { resolver }
    }

    /// Collects the definition documents of a directory.
    pub fn discover(&self, defs_dir: &str) -> DefsResult<Vec<String>> {
        let files = self.resolver.list_files(defs_dir, DEFS_EXTENSIONS)?;
        if files.is_empty() {
            return Err(DefsError::source_not_found(
                defs_dir,
                "no definitions file found",
            ));
        }
        Ok(files
            .into_iter()
            .map(|path| path.display().to_string())
            .collect())
    }

    /// Loads one document. The top level must be a mapping.
    pub fn load_one(&self, id: &str) -> DefsResult<DefNode> {
        let resource = self.resolver.read(id)?;
        let node = DefNode::from_yaml_str(&resource.content)
            .map_err(|e| DefsError::malformed(id, e))?;
        if !node.is_map() {
            return Err(DefsError::malformed(
                id,
                format!("top level must be a mapping, found {}", node.kind_name()),
            ));
        }
        debug!(source = id, "source parsed");
        Ok(node)
    }

    /// Loads every source in order and merges them, later sources winning.
    pub fn load(&self, ids: &[String]) -> DefsResult<DefNode> {
        info!(sources = ids.len(), "load defined defs");
        let nodes = ids
            .iter()
            .map(|id| self.load_one(id))
            .collect::<DefsResult<Vec<_>>>()?;
        merge_all(nodes).ok_or_else(|| DefsError::source_not_found("<none>", "empty source list"))
    }

    /// Loads the document holding the default step groups.
    pub fn load_default_steps(&self, id: &str) -> DefsResult<DefNode> {
        info!(source = id, "load default steps");
        let node = self.load_one(id)?;
        if !node.get("steps").map_or(false, DefNode::is_map) {
            return Err(DefsError::malformed(id, "expected a 'steps' mapping"));
        }
        Ok(node)
    }
}

/// Copies every group of `default_steps`' `steps` mapping into `defs`,
/// replacing same-named groups and creating `steps` when absent.
pub fn merge_default_steps(defs: &mut DefNode, default_steps: &DefNode) {
    let Some(groups) = default_steps.get("steps").and_then(DefNode::as_map) else {
        return;
    };
    let Some(root) = defs.as_map_mut() else {
        return;
    };

    let steps = root.entry("steps".to_string()).or_insert_with(DefNode::map);
    if !steps.is_map() {
        *steps = DefNode::map();
    }
    if let Some(steps) = steps.as_map_mut() {
        for (name, group) in groups {
            steps.insert(name.clone(), group.clone());
        }
    }
}
