use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// A run-scoped logging interface.
///
/// Every pipeline run gets a `RunLog` carrying a process-unique run id.
/// All log events it emits include that id, so the stages of one run can be
/// correlated in structured output. Stages reach it through
/// [`Next::log`](crate::Next::log).
#[derive(Debug, Clone, Copy)]
pub struct RunLog {
    run_id: u64,
}

impl RunLog {
    /// Allocates a fresh run id.
    ///
    /// Only the pipeline starts runs.
    pub(crate) fn start() -> Self {
        Self {
            run_id: NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Returns the run id associated with this logger.
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Logs an info-level message with the run id.
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(run_id = self.run_id, "{}", args);
    }

    /// Logs a warning-level message with the run id.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(run_id = self.run_id, "{}", args);
    }

    /// Logs a debug-level message with the run id.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(run_id = self.run_id, "{}", args);
    }

    /// Logs entry into a stage, with the stage label as a field.
    pub(crate) fn stage(&self, index: usize, label: &str) {
        tracing::debug!(run_id = self.run_id, stage = label, index, "entering stage");
    }

    /// Logs a stage that returned without calling `next`.
    pub(crate) fn short_circuit(&self, index: usize, label: &str) {
        tracing::debug!(run_id = self.run_id, stage = label, index, "stage short-circuited");
    }
}
