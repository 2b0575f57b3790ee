//! Schema contract subsystem
//!
//! Every tree is checked twice:
//! - against `defined` before normalization
//! - against `effective` after normalization
//!
//! # Design Principles
//!
//! - Validation never mutates the tree
//! - Deterministic validation
//! - Violation reporting is a configured policy (all, or first only)

mod contract;
mod loader;
mod validator;

pub use contract::{SchemaContract, PACKAGED_CONTRACTS};
pub use loader::SchemaLoader;
pub use validator::{SchemaValidator, ViolationPolicy};
