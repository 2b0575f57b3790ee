//! CLI command implementations
//!
//! Every command loads the configuration first and fails before touching
//! the store if the configuration is invalid.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::config::CompilerConfig;
use crate::datadef::{AxisModelBuilder, DataDef, DataDefStore, FileDataDefStore, Outcome, VersionReconciler};
use crate::defs::Defs;
use crate::observability::{log_event_with_fields, Event};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_response, write_text};

/// Dispatches a parsed command.
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Validate { config } => validate(&config),
        Command::Effective { config } => effective(&config),
        Command::Compile {
            config,
            dry_run,
            at,
        } => compile(&config, dry_run, at),
        Command::History { config, name } => history(&config, &name),
        Command::Members { config, name, at } => members(&config, &name, at),
    }
}

fn load_config(path: &Path) -> CliResult<CompilerConfig> {
    let config = CompilerConfig::load(path)?;
    let path = path.display().to_string();
    log_event_with_fields(Event::ConfigLoaded, &[("path", path.as_str())]);
    Ok(config)
}

fn open_store(config: &CompilerConfig) -> CliResult<FileDataDefStore> {
    Ok(FileDataDefStore::open(config.resolve(&config.store_dir), config.high_date)?)
}

fn outcome_json(name: &str, outcome: &Outcome) -> Value {
    let mut entry = json!({ "name": name, "outcome": outcome.as_str() });
    if let Outcome::Superseded { closed_at } = outcome {
        entry["closed_at"] = json!(closed_at.to_rfc3339());
    }
    entry
}

fn version_json(data_def: &DataDef, high_date: DateTime<Utc>) -> Value {
    json!({
        "name": data_def.name(),
        "from_date": data_def.from_date().to_rfc3339(),
        "to_date": data_def.to_date().to_rfc3339(),
        "open": data_def.is_open(high_date),
        "def": data_def.def().to_json_value(),
    })
}

/// Checks the defined and effective trees without compiling.
pub fn validate(config_path: &Path) -> CliResult<()> {
    let defs = Defs::new(load_config(config_path)?)?;
    let defined = defs.load_defined()?;
    defs.validate_defined(&defined)?;
    let effective = defs.create_effective(&defined)?;
    defs.validate_effective(&effective)?;

    let names: Vec<&str> = effective
        .get("dataDefs")
        .and_then(|d| d.as_map())
        .map(|m| m.keys().map(String::as_str).collect())
        .unwrap_or_default();
    write_response(json!({ "valid": true, "data_defs": names }))
}

/// Prints the effective tree.
pub fn effective(config_path: &Path) -> CliResult<()> {
    let defs = Defs::new(load_config(config_path)?)?;
    let defined = defs.load_defined()?;
    defs.validate_defined(&defined)?;
    let effective = defs.create_effective(&defined)?;
    defs.validate_effective(&effective)?;
    write_text(&Defs::pretty(&effective)?)
}

/// Compiles and reconciles. With `dry_run`, reports outcomes against the
/// store without writing.
pub fn compile(config_path: &Path, dry_run: bool, at: Option<DateTime<Utc>>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let defs = Defs::new(config)?;
    let compiled = defs.compile(at.unwrap_or_else(Utc::now))?;

    let outcomes: Vec<Value> = if dry_run {
        let reconciler = VersionReconciler::new(defs.config().high_date);
        let mut outcomes = Vec::with_capacity(compiled.data_defs.len());
        for data_def in &compiled.data_defs {
            let open = store.find_open_by_name(data_def.name())?;
            let reconciliation =
                reconciler.reconcile(std::slice::from_ref(data_def), open.into_iter().collect())?;
            for (name, outcome) in &reconciliation.outcomes {
                outcomes.push(outcome_json(name, outcome));
            }
        }
        outcomes
    } else {
        defs.reconcile(&store, &compiled.data_defs)?
            .outcomes
            .iter()
            .map(|(name, outcome)| outcome_json(name, outcome))
            .collect()
    };

    write_response(json!({
        "run_id": compiled.run_id.to_string(),
        "run_timestamp": compiled.run_timestamp.to_rfc3339(),
        "dry_run": dry_run,
        "outcomes": outcomes,
    }))
}

/// Lists stored versions of one DataDef.
pub fn history(config_path: &Path, name: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let versions = store.find_all(name)?;
    if versions.is_empty() {
        return Err(CliError::not_found(format!("no versions stored for '{}'", name)));
    }

    let versions: Vec<Value> = versions
        .iter()
        .map(|d| version_json(d, config.high_date))
        .collect();
    write_response(json!({ "name": name, "versions": versions }))
}

/// Expands the member tuples of the version active at `at`.
pub fn members(config_path: &Path, name: &str, at: Option<DateTime<Utc>>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let instant = at.unwrap_or_else(Utc::now);
    let data_def = store
        .find_active_at(name, instant)?
        .ok_or_else(|| CliError::not_found(format!("no version of '{}' active at {}", name, instant.to_rfc3339())))?;

    let data = AxisModelBuilder::new().data(&data_def)?;
    write_response(json!({
        "name": data.name,
        "from_date": data_def.from_date().to_rfc3339(),
        "members": serde_json::to_value(&data.members)?,
    }))
}
