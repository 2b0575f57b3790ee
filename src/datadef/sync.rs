//! VersionSync - reconciles compiled DataDefs against a store
//!
//! Each name is reconciled independently against its current open version
//! and written with a compare-and-swap. A lost race waits, re-reads and
//! retries up to the configured limit. The wait doubles per attempt, capped
//! at [`MAX_BACKOFF`].

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::model::DataDef;
use super::reconciler::{Outcome, VersionReconciler};
use super::store::DataDefStore;
use crate::errors::DefsResult;

/// Wait before the first retry unless configured otherwise.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(10);

/// Upper bound of a single wait between retries.
pub const MAX_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<(String, Outcome)>,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        self.outcomes.iter().any(|(_, o)| o.is_change())
    }

    pub fn count(&self, label: &str) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.as_str() == label).count()
    }
}

pub struct VersionSync<'a> {
    store: &'a dyn DataDefStore,
    reconciler: VersionReconciler,
    retries: u32,
    backoff: Duration,
}

impl<'a> VersionSync<'a> {
    pub fn new(store: &'a dyn DataDefStore, reconciler: VersionReconciler, retries: u32) -> Self {
        Self {
            store,
            reconciler,
            retries,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Sets the wait before the first retry.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Wait before retry number `attempt` (1-based).
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }

    pub fn apply(&self, new_defs: &[DataDef]) -> DefsResult<SyncReport> {
        let mut report = SyncReport::default();
        for new_def in new_defs {
            let outcome = self.apply_one(new_def)?;
            report.outcomes.push((new_def.name().to_string(), outcome));
        }
        info!(
            total = report.outcomes.len(),
            inserted = report.count("inserted"),
            superseded = report.count("superseded"),
            unchanged = report.count("unchanged"),
            "data defs synchronized"
        );
        Ok(report)
    }

    fn apply_one(&self, new_def: &DataDef) -> DefsResult<Outcome> {
        let name = new_def.name();
        let mut attempt = 0;
        loop {
            let open = self.store.find_open_by_name(name)?;
            let reconciliation = self
                .reconciler
                .reconcile(std::slice::from_ref(new_def), open.iter().cloned().collect())?;
            let outcome = reconciliation
                .outcomes
                .first()
                .map(|(_, o)| *o)
                .unwrap_or(Outcome::Unchanged);

            if !reconciliation.changed {
                return Ok(outcome);
            }

            let writes: Vec<DataDef> = reconciliation.writes().cloned().collect();
            match self.store.compare_and_swap(name, open.as_ref(), &writes) {
                Ok(()) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    let delay = self.delay(attempt);
                    warn!(
                        name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "data def sync conflict, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
