//! Normalizer - turns a defined tree into an effective tree
//!
//! Passes run in a fixed order; each assumes the shape left by its
//! predecessor:
//!
//! 1. add fact dimension
//! 2. add item index
//! 3. add item order
//! 4. expand top-level steps
//! 5. set default steps
//! 6. expand task steps
//!
//! Every pass only fills in what is missing or replaces references with
//! their targets, so normalizing an effective tree again is a fixed point.

mod axis;
mod steps;

use std::fmt;

use tracing::{debug, info};

use crate::errors::DefsResult;
use crate::tree::DefNode;

pub use axis::FACT_MEMBER;

/// The normalization passes, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    AddFactDim,
    AddItemIndex,
    AddItemOrder,
    ExpandSteps,
    SetDefaultSteps,
    ExpandTaskSteps,
}

impl Pass {
    /// Execution order. Do not reorder.
    pub const ORDER: [Pass; 6] = [
        Pass::AddFactDim,
        Pass::AddItemIndex,
        Pass::AddItemOrder,
        Pass::ExpandSteps,
        Pass::SetDefaultSteps,
        Pass::ExpandTaskSteps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pass::AddFactDim => "add_fact_dim",
            Pass::AddItemIndex => "add_item_index",
            Pass::AddItemOrder => "add_item_order",
            Pass::ExpandSteps => "expand_steps",
            Pass::SetDefaultSteps => "set_default_steps",
            Pass::ExpandTaskSteps => "expand_task_steps",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    default_steps_name: String,
}

impl Normalizer {
    pub fn new(default_steps_name: impl Into<String>) -> Self {
        Self {
            default_steps_name: default_steps_name.into(),
        }
    }

    pub fn default_steps_name(&self) -> &str {
        &self.default_steps_name
    }

    /// Normalizes a deep copy of `defined`. The input is never mutated and
    /// nothing is returned unless every pass succeeds.
    pub fn normalize(&self, defined: &DefNode) -> DefsResult<DefNode> {
        info!("create effective defs");
        let mut effective = defined.clone();
        for pass in Pass::ORDER {
            self.run(pass, &mut effective)?;
            debug!(pass = pass.as_str(), "normalization pass complete");
        }
        Ok(effective)
    }

    fn run(&self, pass: Pass, defs: &mut DefNode) -> DefsResult<()> {
        match pass {
            Pass::AddFactDim => axis::add_fact_dim(defs),
            Pass::AddItemIndex => axis::add_item_index(defs),
            Pass::AddItemOrder => axis::add_item_order(defs),
            Pass::ExpandSteps => steps::expand_steps(defs)?,
            Pass::SetDefaultSteps => steps::set_default_steps(defs, &self.default_steps_name)?,
            Pass::ExpandTaskSteps => steps::expand_task_steps(defs)?,
        }
        Ok(())
    }
}
