//! Definition tree model
//!
//! The tree is a tagged variant so every rewrite pattern-matches
//! exhaustively over the three node shapes.

mod merge;
mod node;

pub use merge::{merge, merge_all};
pub use node::{DefMap, DefNode, Scalar};
