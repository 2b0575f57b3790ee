//! Defs - the definitions pipeline
//!
//! ```text
//! discover -> load + merge -> default steps -> validate(defined)
//!          -> normalize -> validate(effective) -> compile DataDefs
//! ```
//!
//! A run yields a [`CompiledDefs`] or fails as a whole: no stage output is
//! returned once a later stage has failed.

use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::CompilerConfig;
use crate::datadef::{DataDef, DataDefCompiler, DataDefStore, SyncReport, VersionReconciler, VersionSync};
use crate::errors::{DefsError, DefsResult};
use crate::normalize::Normalizer;
use crate::observability::{log_event, log_event_with_fields, Event, RunScope};
use crate::schema::{SchemaLoader, SchemaValidator};
use crate::source::{merge_default_steps, ResourceResolver, SourceLoader};
use crate::tree::DefNode;

/// Output of one successful run.
#[derive(Debug, Clone)]
pub struct CompiledDefs {
    pub run_id: Uuid,
    pub run_timestamp: DateTime<Utc>,
    pub defined: DefNode,
    pub effective: DefNode,
    pub data_defs: Vec<DataDef>,
}

pub struct Defs {
    config: CompilerConfig,
    resolver: ResourceResolver,
    schemas: SchemaLoader,
    validator: SchemaValidator,
    normalizer: Normalizer,
    compiler: DataDefCompiler,
}

impl Defs {
    pub fn new(config: CompilerConfig) -> DefsResult<Self> {
        let resolver = ResourceResolver::new(config.base_dir.clone());
        Self::with_resolver(config, resolver)
    }

    /// Builds the pipeline over a caller-supplied resolver.
    pub fn with_resolver(config: CompilerConfig, resolver: ResourceResolver) -> DefsResult<Self> {
        config.validate()?;

        let mut schemas = SchemaLoader::new();
        schemas.load(&resolver, &config.defined_schema)?;
        schemas.load(&resolver, &config.effective_schema)?;
        let count = schemas.schema_count().to_string();
        log_event_with_fields(Event::SchemasLoaded, &[("count", count.as_str())]);

        Ok(Self {
            validator: SchemaValidator::new(config.violation_policy),
            normalizer: Normalizer::new(config.default_steps_name.clone()),
            compiler: DataDefCompiler::new(config.high_date),
            config,
            resolver,
            schemas,
        })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Loads and merges every source under `defs_dir`, then merges the
    /// default step groups if configured.
    pub fn load_defined(&self) -> DefsResult<DefNode> {
        let loader = SourceLoader::new(&self.resolver);
        let defs_dir = self.config.defs_dir.to_string_lossy().into_owned();
        let ids = loader.discover(&defs_dir)?;
        let mut defined = loader.load(&ids)?;
        let count = ids.len().to_string();
        log_event_with_fields(Event::SourcesLoaded, &[("count", count.as_str()), ("dir", defs_dir.as_str())]);

        if let Some(file) = &self.config.default_steps_file {
            let file = file.to_string_lossy().into_owned();
            let default_steps = loader.load_default_steps(&file)?;
            merge_default_steps(&mut defined, &default_steps);
            log_event_with_fields(Event::DefaultStepsMerged, &[("file", file.as_str())]);
        }
        Ok(defined)
    }

    pub fn validate_defined(&self, defined: &DefNode) -> DefsResult<()> {
        let contract = self.schemas.get(&self.config.defined_schema)?;
        self.validator.validate(defined, contract)?;
        log_event(Event::DefinedValidated);
        Ok(())
    }

    pub fn create_effective(&self, defined: &DefNode) -> DefsResult<DefNode> {
        let effective = self.normalizer.normalize(defined)?;
        log_event(Event::EffectiveCreated);
        Ok(effective)
    }

    pub fn validate_effective(&self, effective: &DefNode) -> DefsResult<()> {
        let contract = self.schemas.get(&self.config.effective_schema)?;
        self.validator.validate(effective, contract)?;
        log_event(Event::EffectiveValidated);
        Ok(())
    }

    /// Compiles the DataDefs of a validated effective tree.
    pub fn data_defs(&self, effective: &DefNode, run_timestamp: DateTime<Utc>) -> DefsResult<Vec<DataDef>> {
        let data_defs = self.compiler.compile(effective, run_timestamp.trunc_subsecs(0))?;
        let count = data_defs.len().to_string();
        log_event_with_fields(Event::DataDefsCompiled, &[("count", count.as_str())]);
        Ok(data_defs)
    }

    /// Full run from the configured sources.
    pub fn compile(&self, run_timestamp: DateTime<Utc>) -> DefsResult<CompiledDefs> {
        self.scoped(|defs| {
            let defined = defs.load_defined()?;
            defs.compile_defined(defined, run_timestamp)
        })
    }

    /// Full run from an already loaded defined tree.
    pub fn compile_tree(&self, defined: DefNode, run_timestamp: DateTime<Utc>) -> DefsResult<CompiledDefs> {
        self.scoped(|defs| defs.compile_defined(defined, run_timestamp))
    }

    fn scoped(&self, run: impl FnOnce(&Self) -> DefsResult<CompiledDefs>) -> DefsResult<CompiledDefs> {
        let run_id = Uuid::new_v4();
        let scope = RunScope::new("DEFS_RUN", run_id.to_string());
        match run(self) {
            Ok(mut compiled) => {
                compiled.run_id = run_id;
                scope.complete();
                Ok(compiled)
            }
            Err(e) => {
                let run_id = run_id.to_string();
                log_event_with_fields(Event::RunFailed, &[("code", e.code()), ("run_id", run_id.as_str())]);
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn compile_defined(&self, defined: DefNode, run_timestamp: DateTime<Utc>) -> DefsResult<CompiledDefs> {
        let run_timestamp = run_timestamp.trunc_subsecs(0);
        self.validate_defined(&defined)?;
        let effective = self.create_effective(&defined)?;
        self.validate_effective(&effective)?;
        let data_defs = self.data_defs(&effective, run_timestamp)?;
        Ok(CompiledDefs {
            run_id: Uuid::nil(),
            run_timestamp,
            defined,
            effective,
            data_defs,
        })
    }

    /// Reconciles compiled DataDefs into `store`.
    pub fn reconcile(&self, store: &dyn DataDefStore, data_defs: &[DataDef]) -> DefsResult<SyncReport> {
        log_event(Event::ReconcileBegin);
        let sync = VersionSync::new(
            store,
            VersionReconciler::new(self.config.high_date),
            self.config.reconcile_retries,
        )
        .with_backoff(Duration::from_millis(self.config.reconcile_backoff_ms));
        let report = sync.apply(data_defs);
        match &report {
            Ok(report) => {
                let changed = report.changed().to_string();
                log_event_with_fields(Event::ReconcileComplete, &[("changed", changed.as_str())]);
            }
            Err(e) if e.is_retryable() => log_event(Event::ReconcileConflict),
            Err(_) => {}
        }
        report
    }

    /// YAML rendering of a tree.
    pub fn pretty(tree: &DefNode) -> DefsResult<String> {
        info!("pretty print defs");
        tree.to_yaml_string()
            .map_err(|e| DefsError::malformed("<tree>", e))
    }
}
