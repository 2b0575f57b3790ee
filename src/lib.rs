//! scrapedef - definition compiler and temporal versioning engine
//!
//! Loads declarative scraper definitions, validates them against schema
//! contracts, normalizes them into an effective form, and compiles each
//! data definition into a time-versioned DataDef reconciled against stored
//! history.

pub mod cache;
pub mod cli;
pub mod config;
pub mod datadef;
pub mod defs;
pub mod errors;
pub mod normalize;
pub mod observability;
pub mod schema;
pub mod source;
pub mod tree;

mod durable;

pub use config::CompilerConfig;
pub use datadef::{AxisKind, AxisModelBuilder, DataDef, DataDefCompiler, VersionReconciler};
pub use defs::{CompiledDefs, Defs};
pub use errors::{DefsError, DefsResult, Violation};
pub use tree::{DefMap, DefNode};
