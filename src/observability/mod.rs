//! Observability
//!
//! Structured logging through `tracing`. Library code only emits; the
//! binary installs the subscriber with [`init_logging`].
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on compilation
//! 3. One log line = one event

mod events;
mod scope;

pub use events::Event;
pub use scope::RunScope;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a fmt subscriber on stderr filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn render(fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = fields.to_vec();
    sorted.sort_by_key(|(k, _)| *k);
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Logs an event with fields rendered in key order.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let rendered = render(fields);
    if event.is_failure() {
        error!(event = event.as_str(), fields = %rendered);
    } else {
        info!(event = event.as_str(), fields = %rendered);
    }
}
