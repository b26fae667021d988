//! Property tests for pipeline ordering and short-circuit behavior.

use std::sync::{Arc, Mutex};

use pipeline_bus::{
    bind_parameters, BindingStrategy, Container, Next, Param, Pipe, Pipeline, Result, Stage,
    StageRegistry,
};
use proptest::prelude::*;

type Trace = Arc<Mutex<Vec<usize>>>;

fn forwarding(trace: &Trace, index: usize) -> Stage<i64, i64> {
    let trace = Arc::clone(trace);
    Stage::inline(move |n: i64, next: Next<'_, i64, i64>| {
        trace.lock().unwrap().push(index);
        next.run(n)
    })
}

fn halting(trace: &Trace, index: usize) -> Stage<i64, i64> {
    let trace = Arc::clone(trace);
    Stage::inline(move |_n: i64, _next: Next<'_, i64, i64>| {
        trace.lock().unwrap().push(index);
        Ok(-(index as i64) - 1)
    })
}

const DESTINATION: usize = usize::MAX;

proptest! {
    /// Property: an empty pipeline is the destination itself
    #[test]
    fn proptest_empty_pipeline_equals_destination(payload in any::<i64>()) {
        let pipeline: Pipeline<i64, i64> = Pipeline::inline_only();

        let via_pipeline = pipeline.dispatch(payload, |n| Ok(n.wrapping_mul(3))).unwrap();
        prop_assert_eq!(via_pipeline, payload.wrapping_mul(3));
    }

    /// Property: forwarding stages run once each, in declared order, then
    /// the destination runs once
    #[test]
    fn proptest_stages_run_in_declared_order(len in 0usize..12, payload in any::<i64>()) {
        let trace: Trace = Arc::default();
        let pipeline = Pipeline::inline_only().through((0..len).map(|i| forwarding(&trace, i)));

        let t = Arc::clone(&trace);
        let out = pipeline
            .dispatch(payload, move |n| {
                t.lock().unwrap().push(DESTINATION);
                Ok(n)
            })
            .unwrap();

        let mut expected: Vec<usize> = (0..len).collect();
        expected.push(DESTINATION);
        prop_assert_eq!(out, payload);
        prop_assert_eq!(trace.lock().unwrap().clone(), expected);
    }

    /// Property: a stage that skips `next` hides every later stage and the
    /// destination, and its own value is the result
    #[test]
    fn proptest_short_circuit_stops_chain(
        (len, halt_at) in (1usize..12).prop_flat_map(|len| (Just(len), 0..len)),
        payload in any::<i64>()
    ) {
        let trace: Trace = Arc::default();
        let stages: Vec<_> = (0..len)
            .map(|i| if i == halt_at { halting(&trace, i) } else { forwarding(&trace, i) })
            .collect();
        let pipeline = Pipeline::inline_only().through(stages);

        let t = Arc::clone(&trace);
        let out = pipeline
            .dispatch(payload, move |n| {
                t.lock().unwrap().push(DESTINATION);
                Ok(n)
            })
            .unwrap();

        prop_assert_eq!(out, -(halt_at as i64) - 1);
        prop_assert_eq!(trace.lock().unwrap().clone(), (0..=halt_at).collect::<Vec<_>>());
    }

    /// Property: the destination receives the last forwarded payload
    #[test]
    fn proptest_last_forwarded_value_wins(increments in prop::collection::vec(-1000i64..1000, 0..10)) {
        let stages: Vec<Stage<i64, i64>> = increments
            .iter()
            .map(|&inc| Stage::inline(move |n: i64, next: Next<'_, i64, i64>| next.run(n + inc)))
            .collect();
        let pipeline = Pipeline::inline_only().through(stages);

        let out = pipeline.dispatch(0, Ok).unwrap();
        prop_assert_eq!(out, increments.iter().sum::<i64>());
    }

    /// Property: binding follows registry, then default, then absent
    #[test]
    fn proptest_binding_fallback_order(
        registered in any::<bool>(),
        default in prop::option::of(any::<u32>()),
        value in any::<u32>()
    ) {
        let container = if registered {
            Container::new().instance(value)
        } else {
            Container::new()
        };
        let mut param = Param::new("n").typed::<u32>();
        if let Some(d) = default {
            param = param.default_value(d);
        }

        let args = bind_parameters(&[param], &container, BindingStrategy::TypeDirected).unwrap();
        let bound = args.get::<u32>("n").map(|v| *v);

        match (registered, default) {
            (true, _) => prop_assert_eq!(bound, Some(value)),
            (false, Some(d)) => prop_assert_eq!(bound, Some(d)),
            (false, None) => prop_assert!(args.is_absent("n")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Payload {
    x: i32,
    seen: Vec<&'static str>,
}

struct Observe(&'static str);

impl Pipe<Payload, Payload> for Observe {
    fn handle(&self, mut p: Payload, next: Next<'_, Payload, Payload>, _args: &[String]) -> Result<Payload> {
        p.seen.push(self.0);
        next.run(p)
    }
}

struct Bump;

impl Pipe<Payload, Payload> for Bump {
    fn handle(&self, p: Payload, next: Next<'_, Payload, Payload>, args: &[String]) -> Result<Payload> {
        let by: i32 = args.first().and_then(|a| a.parse().ok()).unwrap_or(1);
        next.run(Payload { x: p.x + by, ..p })
    }
}

fn registry() -> Arc<StageRegistry<Payload, Payload>> {
    Arc::new(
        StageRegistry::new()
            .register("logPipe", || Observe("logPipe"))
            .register("authPipe", || Observe("authPipe"))
            .register("bump", || Bump),
    )
}

#[test]
fn log_then_auth_then_identity() {
    let pipeline = Pipeline::new(registry()).through(vec![
        Stage::parse("logPipe").unwrap(),
        Stage::parse("authPipe").unwrap(),
    ]);

    let out = pipeline
        .dispatch(Payload { x: 1, seen: Vec::new() }, Ok)
        .unwrap();

    assert_eq!(out.x, 1);
    assert_eq!(out.seen, vec!["logPipe", "authPipe"]);
}

#[test]
fn mutating_pipe_forwards_new_value() {
    let pipeline = Pipeline::new(registry()).through(vec![
        Stage::parse("logPipe").unwrap(),
        Stage::parse("bump:41").unwrap(),
        Stage::parse("authPipe").unwrap(),
    ]);

    let out = pipeline
        .send(Payload { x: 1, seen: Vec::new() })
        .then(Ok)
        .unwrap();

    assert_eq!(out.x, 42);
    assert_eq!(out.seen, vec!["logPipe", "authPipe"]);
}
