//! RunScope - begin/complete logging around one unit of work
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` with elapsed time on `complete()`
//! - Logs `{name}_FAILED` on `fail()`
//! - Logs `{name}_INCOMPLETE` if dropped without either

use std::time::Instant;

use tracing::{error, info, warn};

pub struct RunScope {
    name: String,
    run_id: String,
    started: Instant,
    finished: bool,
}

impl RunScope {
    pub fn new(name: impl Into<String>, run_id: impl Into<String>) -> Self {
        let name = name.into();
        let run_id = run_id.into();
        info!(event = %format!("{}_BEGIN", name), run_id = %run_id);
        Self {
            name,
            run_id,
            started: Instant::now(),
            finished: false,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn complete(mut self) {
        self.finished = true;
        info!(
            event = %format!("{}_COMPLETE", self.name),
            run_id = %self.run_id,
            elapsed_ms = self.elapsed_ms() as u64
        );
    }

    pub fn fail(mut self, reason: &str) {
        self.finished = true;
        error!(
            event = %format!("{}_FAILED", self.name),
            run_id = %self.run_id,
            reason
        );
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for RunScope {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                event = %format!("{}_INCOMPLETE", self.name),
                run_id = %self.run_id,
                reason = "scope dropped without completion"
            );
        }
    }
}
