//! Compiled, time-versioned data definitions
//!
//! # Lifecycle
//!
//! 1. [`DataDefCompiler`] turns each `dataDefs` entry of an effective tree
//!    into an open DataDef starting at the run timestamp
//! 2. [`VersionReconciler`] merges them into the stored history, closing
//!    superseded versions
//! 3. [`DataDefStore`] persists the history; [`VersionSync`] drives the
//!    reconcile-and-swap loop against it
//! 4. [`AxisModelBuilder`] expands a DataDef into member tuples
//!
//! # Invariants
//!
//! - At most one open version per name
//! - Closed ranges never overlap and end one second before their successor
//! - An unchanged definition never creates a version

mod axis;
mod compiler;
mod model;
mod reconciler;
mod store;
mod sync;

pub use axis::{Axis, AxisKind, AxisModelBuilder, AxisSets, Data, Member};
pub use compiler::DataDefCompiler;
pub use model::{to_map, DataDef};
pub use reconciler::{Outcome, Reconciliation, VersionReconciler};
pub use store::{DataDefStore, FileDataDefStore, MemoryDataDefStore};
pub use sync::{SyncReport, VersionSync};
