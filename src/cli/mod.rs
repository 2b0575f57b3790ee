//! CLI module for scrapedef
//!
//! Provides command-line interface for:
//! - validate: check defined and effective trees
//! - effective: print the effective tree
//! - compile: compile DataDefs and reconcile them into the store
//! - history: list stored versions of a DataDef
//! - members: expand the member tuples of a DataDef

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{compile, effective, history, members, run_command, validate};
pub use errors::{CliError, CliErrorCode, CliResult};

/// Parses process arguments and runs the selected command.
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args().command)
}
