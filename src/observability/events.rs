//! Lifecycle events of a definitions run
//!
//! Events are explicit and typed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Run (begin and completion are logged by RunScope)
    RunFailed,

    // Configuration
    ConfigLoaded,
    SchemasLoaded,

    // Pipeline stages
    SourcesLoaded,
    DefaultStepsMerged,
    DefinedValidated,
    EffectiveCreated,
    EffectiveValidated,
    DataDefsCompiled,

    // Versioning
    ReconcileBegin,
    ReconcileComplete,
    ReconcileConflict,

    // Artifact cache
    ArtifactSaved,
    ArtifactIntegrityFailure,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RunFailed => "DEFS_RUN_FAILED",

            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",

            Event::SourcesLoaded => "SOURCES_LOADED",
            Event::DefaultStepsMerged => "DEFAULT_STEPS_MERGED",
            Event::DefinedValidated => "DEFINED_VALIDATED",
            Event::EffectiveCreated => "EFFECTIVE_CREATED",
            Event::EffectiveValidated => "EFFECTIVE_VALIDATED",
            Event::DataDefsCompiled => "DATADEFS_COMPILED",

            Event::ReconcileBegin => "RECONCILE_BEGIN",
            Event::ReconcileComplete => "RECONCILE_COMPLETE",
            Event::ReconcileConflict => "RECONCILE_CONFLICT",

            Event::ArtifactSaved => "ARTIFACT_SAVED",
            Event::ArtifactIntegrityFailure => "ARTIFACT_INTEGRITY_FAILURE",
        }
    }

    /// True for events that end a run or reject stored data.
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::RunFailed | Event::ArtifactIntegrityFailure)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
