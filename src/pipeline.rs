//! The onion pipeline.
//!
//! A [`Pipeline`] threads a payload through an ordered list of stages and
//! then into a destination. The chain is built by folding the stage list
//! right to left around the destination, so the first declared stage is the
//! outermost layer and runs first.
//!
//! ```text
//! dispatch(payload)
//!   ↓
//! stage 1 ── next ──→ stage 2 ── next ──→ ... ──→ destination
//!   ↑                                               │
//!   └──────────────── result flows back ←───────────┘
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::logging::RunLog;
use crate::next::Next;
use crate::registry::{ResolveStage, StageRegistry};
use crate::stage::Stage;

/// An ordered list of stages with the registry used to resolve named ones.
///
/// The pipeline keeps no state between runs. One instance can serve any
/// number of [`dispatch`](Self::dispatch) calls, from several threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pipeline_bus::{Next, Pipe, Pipeline, Result, Stage, StageRegistry};
///
/// struct Exclaim;
///
/// impl Pipe<String, String> for Exclaim {
///     fn handle(&self, s: String, next: Next<'_, String, String>, args: &[String]) -> Result<String> {
///         let marks = args.first().and_then(|n| n.parse().ok()).unwrap_or(1);
///         next.run(format!("{}{}", s, "!".repeat(marks)))
///     }
/// }
///
/// let registry: StageRegistry<String, String> = StageRegistry::new().register("exclaim", || Exclaim);
/// let pipeline = Pipeline::new(Arc::new(registry))
///     .pipe(Stage::inline(|s: String, next| next.run(s.to_uppercase())))
///     .pipe(Stage::parse("exclaim:3").unwrap());
///
/// let out = pipeline.send("hi".to_string()).then(Ok).unwrap();
/// assert_eq!(out, "HI!!!");
/// ```
pub struct Pipeline<P, R> {
    registry: Arc<dyn ResolveStage<P, R>>,
    stages: Vec<Stage<P, R>>,
}

impl<P: 'static, R: 'static> Pipeline<P, R> {
    /// Creates an empty pipeline that resolves named stages through `registry`.
    pub fn new(registry: Arc<dyn ResolveStage<P, R>>) -> Self {
        Self {
            registry,
            stages: Vec::new(),
        }
    }

    /// Creates a pipeline with an empty registry.
    ///
    /// Any named stage added to it fails to resolve when reached.
    pub fn inline_only() -> Self {
        Self::new(Arc::new(StageRegistry::new()))
    }

    /// Replaces the stage list.
    pub fn through<I>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = Stage<P, R>>,
    {
        self.stages = stages.into_iter().collect();
        self
    }

    /// Appends one stage.
    pub fn pipe(mut self, stage: Stage<P, R>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Returns the configured stages in declared order.
    pub fn stages(&self) -> &[Stage<P, R>] {
        &self.stages
    }

    /// Number of configured stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stage is configured.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Starts a fluent run: `pipeline.send(payload).then(destination)`.
    pub fn send(&self, payload: P) -> Sending<'_, P, R> {
        Sending {
            pipeline: self,
            payload,
        }
    }

    /// Runs `payload` through every stage and then into `destination`.
    ///
    /// Returns the destination's result, or the value of the first stage
    /// that returned without calling `next`.
    ///
    /// # Errors
    ///
    /// - `Error::Resolution` when a run reaches a named stage the registry
    ///   does not know. Stages before it have already run.
    /// - Any error returned by a stage or the destination, unchanged.
    pub fn dispatch<D>(&self, payload: P, destination: D) -> Result<R>
    where
        D: FnOnce(P) -> Result<R>,
    {
        let log = RunLog::start();
        log.debug(format_args!(
            "pipeline run started with {} stage(s)",
            self.stages.len()
        ));
        self.build_onion(log, destination).run(payload)
    }

    /// Folds the stages right to left around the destination.
    fn build_onion<'a, D>(&'a self, log: RunLog, destination: D) -> Next<'a, P, R>
    where
        D: FnOnce(P) -> Result<R> + 'a,
    {
        let terminal = Next::new(log, move |payload| {
            log.debug(format_args!("destination reached"));
            destination(payload)
        });

        self.stages
            .iter()
            .enumerate()
            .rev()
            .fold(terminal, |next, (index, stage)| {
                let registry = &self.registry;
                Next::new(log, move |payload| {
                    let label = stage.label();
                    log.stage(index, label);

                    let forwarded = Cell::new(false);
                    let next = Next::new(log, |payload| {
                        forwarded.set(true);
                        next.run(payload)
                    });

                    let result = match stage {
                        Stage::Inline(f) => f(payload, next),
                        Stage::Named { name, args } => {
                            let pipe = registry.resolve(name).ok_or_else(|| {
                                log.warn(format_args!("stage '{}' is not registered", name));
                                Error::unresolved_stage(name.as_str())
                            })?;
                            pipe.handle(payload, next, args)
                        }
                    };

                    if result.is_ok() && !forwarded.get() {
                        log.short_circuit(index, label);
                    }
                    result
                })
            })
    }
}

impl<P, R> Clone for Pipeline<P, R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            stages: self.stages.clone(),
        }
    }
}

impl<P, R> fmt::Debug for Pipeline<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

/// A payload on its way into a pipeline, waiting for its destination.
#[must_use = "a payload is only sent once `then` is called"]
pub struct Sending<'p, P, R> {
    pipeline: &'p Pipeline<P, R>,
    payload: P,
}

impl<P: 'static, R: 'static> Sending<'_, P, R> {
    /// Runs the pipeline with `destination` as the terminal stage.
    pub fn then<D>(self, destination: D) -> Result<R>
    where
        D: FnOnce(P) -> Result<R>,
    {
        self.pipeline.dispatch(self.payload, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::next::Next;
    use crate::stage::Pipe;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn recording(trace: &Trace, label: &'static str) -> Stage<Vec<String>, Vec<String>> {
        let trace = Arc::clone(trace);
        Stage::inline(move |mut payload: Vec<String>, next| {
            trace.lock().unwrap().push(label.to_string());
            payload.push(label.to_string());
            next.run(payload)
        })
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(run: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, run);

        let bytes = captured.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    struct Suffix;

    impl Pipe<String, String> for Suffix {
        fn handle(&self, s: String, next: Next<'_, String, String>, args: &[String]) -> Result<String> {
            next.run(format!("{}[{}]", s, args.join("|")))
        }
    }

    #[test]
    fn empty_pipeline_calls_destination() {
        let pipeline: Pipeline<i32, i32> = Pipeline::inline_only();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.dispatch(5, |n| Ok(n + 1)).unwrap(), 6);
    }

    #[test]
    fn stages_run_in_declared_order() {
        let trace: Trace = Arc::default();
        let pipeline = Pipeline::inline_only()
            .pipe(recording(&trace, "first"))
            .pipe(recording(&trace, "second"))
            .pipe(recording(&trace, "third"));

        let t = Arc::clone(&trace);
        let out = pipeline
            .dispatch(Vec::new(), move |payload| {
                t.lock().unwrap().push("destination".to_string());
                Ok(payload)
            })
            .unwrap();

        assert_eq!(out, vec!["first", "second", "third"]);
        assert_eq!(
            *trace.lock().unwrap(),
            vec!["first", "second", "third", "destination"]
        );
    }

    #[test]
    fn stage_can_short_circuit() {
        let trace: Trace = Arc::default();
        let pipeline = Pipeline::inline_only()
            .pipe(recording(&trace, "outer"))
            .pipe(Stage::inline(|_payload: Vec<String>, _next| {
                Ok(vec!["halted".to_string()])
            }))
            .pipe(recording(&trace, "inner"));

        let out = pipeline
            .dispatch(Vec::new(), |_| panic!("destination must not run"))
            .unwrap();

        assert_eq!(out, vec!["halted"]);
        assert_eq!(*trace.lock().unwrap(), vec!["outer"]);
    }

    #[test]
    fn stage_can_post_process_result() {
        let pipeline = Pipeline::inline_only().pipe(Stage::inline(|n: i32, next: Next<'_, i32, i32>| {
            let inner = next.run(n)?;
            Ok(inner * 2)
        }));

        assert_eq!(pipeline.dispatch(3, |n| Ok(n + 1)).unwrap(), 8);
    }

    #[test]
    fn named_stage_receives_arguments() {
        let registry: StageRegistry<String, String> = StageRegistry::new().register("suffix", || Suffix);
        let pipeline = Pipeline::new(Arc::new(registry))
            .pipe(Stage::parse("suffix:a,b").unwrap())
            .pipe(Stage::named("suffix", ["c"]));

        let out = pipeline.send("x".to_string()).then(Ok).unwrap();
        assert_eq!(out, "x[a|b][c]");
    }

    #[test]
    fn unknown_stage_fails_lazily() {
        let trace: Trace = Arc::default();
        let pipeline = Pipeline::inline_only()
            .pipe(recording(&trace, "before"))
            .pipe(Stage::named("missing", Vec::<String>::new()));

        let err = pipeline.dispatch(Vec::new(), Ok).unwrap_err();

        let resolution = err.as_resolution().expect("resolution error");
        assert_eq!(resolution.name, "missing");
        assert_eq!(*trace.lock().unwrap(), vec!["before"]);
    }

    #[test]
    fn unknown_stage_behind_short_circuit_is_never_resolved() {
        let pipeline: Pipeline<i32, i32> = Pipeline::inline_only()
            .pipe(Stage::inline(|_, _next| Ok(0)))
            .pipe(Stage::named("missing", Vec::<String>::new()));

        assert_eq!(pipeline.dispatch(1, Ok).unwrap(), 0);
    }

    #[test]
    fn destination_error_propagates() {
        let pipeline: Pipeline<i32, i32> =
            Pipeline::inline_only().pipe(Stage::inline(|n, next| next.run(n)));

        let err = pipeline
            .dispatch(1, |_| {
                Err(Error::stage(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )))
            })
            .unwrap_err();

        match err {
            Error::Stage(inner) => {
                let io = inner.downcast_ref::<std::io::Error>().expect("io error");
                assert_eq!(io.to_string(), "disk full");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pipeline_is_reusable() {
        let pipeline: Pipeline<i32, i32> =
            Pipeline::inline_only().pipe(Stage::inline(|n: i32, next| next.run(n * 10)));

        assert_eq!(pipeline.dispatch(1, Ok).unwrap(), 10);
        assert_eq!(pipeline.dispatch(2, Ok).unwrap(), 20);
        assert_eq!(pipeline.clone().dispatch(3, Ok).unwrap(), 30);
    }

    #[test]
    fn through_replaces_stages() {
        let pipeline: Pipeline<i32, i32> = Pipeline::inline_only()
            .pipe(Stage::inline(|n: i32, next| next.run(n + 100)))
            .through(vec![Stage::inline(|n: i32, next: Next<'_, i32, i32>| next.run(n + 1))]);

        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.dispatch(0, Ok).unwrap(), 1);
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        let pipeline: Arc<Pipeline<i32, i32>> =
            Arc::new(Pipeline::inline_only().pipe(Stage::inline(|n: i32, next| next.run(n + 1))));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let p = Arc::clone(&pipeline);
                std::thread::spawn(move || p.dispatch(i, Ok).unwrap())
            })
            .collect();

        let mut results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort_unstable();
        assert_eq!(results, vec![1, 2, 3, 4]);
    }

    #[test]
    fn short_circuit_is_logged() {
        let pipeline: Pipeline<i32, i32> = Pipeline::inline_only()
            .pipe(Stage::inline(|n: i32, next| next.run(n)))
            .pipe(Stage::inline(|_, _next| Ok(0)));

        let logs = capture_logs(|| {
            assert_eq!(pipeline.dispatch(7, Ok).unwrap(), 0);
        });

        assert!(logs.contains("stage short-circuited"), "logs: {logs}");
        assert!(logs.contains("index=1"), "logs: {logs}");
        assert!(!logs.contains("destination reached"), "logs: {logs}");
    }

    #[test]
    fn forwarding_stages_are_not_logged_as_short_circuits() {
        let pipeline: Pipeline<i32, i32> =
            Pipeline::inline_only().pipe(Stage::inline(|n: i32, next| next.run(n + 1)));

        let logs = capture_logs(|| {
            assert_eq!(pipeline.dispatch(1, Ok).unwrap(), 2);
        });

        assert!(logs.contains("entering stage"), "logs: {logs}");
        assert!(logs.contains("run_id="), "logs: {logs}");
        assert!(!logs.contains("short-circuited"), "logs: {logs}");
    }

    #[test]
    fn stages_share_the_run_log() {
        let seen: Arc<Mutex<Vec<u64>>> = Arc::default();
        let record = |seen: &Arc<Mutex<Vec<u64>>>| {
            let seen = Arc::clone(seen);
            Stage::inline(move |n: i32, next: Next<'_, i32, i32>| {
                seen.lock().unwrap().push(next.log().run_id());
                next.run(n)
            })
        };
        let pipeline = Pipeline::inline_only().pipe(record(&seen)).pipe(record(&seen));

        pipeline.dispatch(1, Ok).unwrap();
        pipeline.dispatch(2, Ok).unwrap();

        let ids = seen.lock().unwrap();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[2], ids[3]);
        assert_ne!(ids[0], ids[2]);
    }
}
