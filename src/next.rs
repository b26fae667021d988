use std::fmt;

use crate::error::Result;
use crate::logging::RunLog;

/// Continuation to the rest of a pipeline run.
///
/// `Next` is consumed by [`run`](Self::run), so a stage can call the rest of
/// the chain at most once. Dropping it without calling `run` short-circuits
/// the run: later stages and the destination never execute.
///
/// # Examples
///
/// ```
/// use pipeline_bus::{Pipeline, Stage};
///
/// let pipeline = Pipeline::inline_only()
///     .pipe(Stage::inline(|n: i32, next| next.run(n + 1)));
///
/// assert_eq!(pipeline.dispatch(1, |n| Ok(n * 10)).unwrap(), 20);
/// ```
pub struct Next<'a, P, R> {
    log: RunLog,
    call: Box<dyn FnOnce(P) -> Result<R> + 'a>,
}

impl<'a, P, R> Next<'a, P, R> {
    pub(crate) fn new(log: RunLog, call: impl FnOnce(P) -> Result<R> + 'a) -> Self {
        Self {
            log,
            call: Box::new(call),
        }
    }

    /// Returns the logger of the current run.
    ///
    /// Events logged through it carry the same `run_id` as the pipeline's
    /// own events.
    ///
    /// ```
    /// use pipeline_bus::{Pipeline, Stage};
    ///
    /// let pipeline = Pipeline::inline_only().pipe(Stage::inline(|n: u32, next| {
    ///     next.log().info(format_args!("checking quota {}", n));
    ///     next.run(n)
    /// }));
    ///
    /// assert_eq!(pipeline.dispatch(3, Ok).unwrap(), 3);
    /// ```
    pub fn log(&self) -> RunLog {
        self.log
    }

    /// Passes the payload to the rest of the chain and returns its result.
    pub fn run(self, payload: P) -> Result<R> {
        (self.call)(payload)
    }
}

impl<P, R> fmt::Debug for Next<'_, P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("run_id", &self.log.run_id())
            .finish_non_exhaustive()
    }
}
