//! Source loading subsystem
//!
//! Resolves definition documents (packaged resources before the filesystem),
//! parses them and deep-merges them into one defined tree.

mod loader;
mod resolver;

pub use loader::{merge_default_steps, SourceLoader, DEFS_EXTENSIONS};
pub use resolver::{Origin, Resource, ResourceResolver};
