//! scrapedef CLI entry point
//!
//! Installs logging, delegates to `cli::run`, prints errors to stderr and
//! exits non-zero on failure.

use scrapedef::{cli, observability};

fn main() {
    observability::init_logging();
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
