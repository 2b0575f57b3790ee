//! Schema contract registry
//!
//! Contracts are resolved by name or path through the resource resolver,
//! compiled once, and kept for the lifetime of the registry. A registered
//! contract is immutable: registering the same name twice is rejected.

use std::collections::HashMap;

use tracing::debug;

use super::contract::SchemaContract;
use crate::errors::{DefsError, DefsResult};
use crate::source::ResourceResolver;

#[derive(Debug, Default)]
pub struct SchemaLoader {
    contracts: HashMap<String, SchemaContract>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves, compiles and registers the contract `name`.
    ///
    /// Already registered contracts are not reloaded.
    pub fn load(&mut self, resolver: &ResourceResolver, name: &str) -> DefsResult<&SchemaContract> {
        if !self.contracts.contains_key(name) {
            let resource = resolver.read(name).map_err(|e| match e {
                DefsError::SourceNotFound { .. } => DefsError::definition_not_found("schema", name),
                other => other,
            })?;
            let contract = SchemaContract::from_json_str(name, &resource.content)?;
            debug!(schema = name, version = contract.version(), "schema loaded");
            self.contracts.insert(name.to_string(), contract);
        }
        self.get(name)
    }

    /// Registers a contract built in memory.
    pub fn register(&mut self, contract: SchemaContract) -> DefsResult<()> {
        if self.contracts.contains_key(contract.name()) {
            return Err(DefsError::Config(format!(
                "schema '{}' is already registered and immutable",
                contract.name()
            )));
        }
        self.contracts.insert(contract.name().to_string(), contract);
        Ok(())
    }

    /// Gets a registered contract.
    pub fn get(&self, name: &str) -> DefsResult<&SchemaContract> {
        self.contracts
            .get(name)
            .ok_or_else(|| DefsError::definition_not_found("schema", name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    pub fn schema_count(&self) -> usize {
        self.contracts.len()
    }
}
