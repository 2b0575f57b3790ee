//! Schema validator
//!
//! Validation semantics:
//! - Pure function of (tree, contract); never mutates the tree
//! - Deterministic: the same inputs always yield the same violations
//! - Reports every violation or only the first, per `ViolationPolicy`

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::contract::SchemaContract;
use crate::errors::{DefsError, DefsResult, Violation};
use crate::tree::DefNode;

/// How many violations a failed validation reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationPolicy {
    /// Report every violated constraint
    #[default]
    CollectAll,
    /// Stop at the first violated constraint
    FailFast,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator {
    policy: ViolationPolicy,
}

impl SchemaValidator {
    pub fn new(policy: ViolationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ViolationPolicy {
        self.policy
    }

    /// Validates a tree against a contract.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidation` carrying the violated paths.
    pub fn validate(&self, tree: &DefNode, contract: &SchemaContract) -> DefsResult<()> {
        let violations = self.violations(tree, contract);
        if violations.is_empty() {
            debug!(schema = contract.name(), "tree validated");
            return Ok(());
        }
        Err(DefsError::SchemaValidation {
            contract: contract.name().to_string(),
            violations,
        })
    }

    /// Returns the violations of `tree`, bounded by the policy.
    pub fn violations(&self, tree: &DefNode, contract: &SchemaContract) -> Vec<Violation> {
        let instance = tree.to_json_value();
        let limit = match self.policy {
            ViolationPolicy::CollectAll => usize::MAX,
            ViolationPolicy::FailFast => 1,
        };

        contract
            .validator()
            .iter_errors(&instance)
            .take(limit)
            .map(|error| Violation::new(error.instance_path.to_string(), error.to_string()))
            .collect()
    }
}
