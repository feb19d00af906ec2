//! Test: Diamond - A feeds B and C, both feed D

use crate::helpers::*;
use pipeflow::pipes::{CapturePipe, ConstantPipe, FnPipe};
use pipeflow::{Flow, PipeResult, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_diamond_merges_both_branches() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut flow = Flow::new();

    let a = flow.add(emit("A", &[("origin", Value::from("a"))]));
    let b = flow.add(
        ConstantPipe::new(
            "B",
            PipeResult::new().with("shared", "from b").with("only_b", 1),
        )
        .with_passthrough(true),
    );
    let c = flow.add(
        ConstantPipe::new(
            "C",
            PipeResult::new().with("shared", "from c").with("only_c", 2),
        )
        .with_passthrough(true),
    );
    let capture = CapturePipe::new("D");
    let seen = capture.handle();
    let d = flow.add(capture);

    flow.connect(a, b).unwrap();
    flow.connect(a, c).unwrap();
    flow.connect(b, d).unwrap();
    flow.connect(c, d).unwrap();

    // Count invocations of a pipe hanging off A as well
    let extra = flow.add(counting("A2", &calls));
    flow.connect(a, extra).unwrap();
    flow.connect(extra, d).unwrap();

    let (result, recorder) = run_recorded(&mut flow, &[a]);
    result.unwrap();

    let order = recorder.announced_order();
    assert_before(&order, "A", "B");
    assert_before(&order, "A", "C");
    assert_before(&order, "B", "D");
    assert_before(&order, "C", "D");
    assert_eq!(order, recorder.started());

    for name in ["A", "B", "C", "D", "A2"] {
        assert_eq!(
            recorder.started().iter().filter(|n| *n == name).count(),
            1,
            "{} should run exactly once",
            name
        );
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let merged = seen.last().unwrap();
    assert_eq!(merged.get_int("only_b"), Some(1));
    assert_eq!(merged.get_int("only_c"), Some(2));
    assert_eq!(merged.get_text("origin"), Some("a"));
    // C runs after B, so its value is attached later and wins
    assert_eq!(merged.get_text("shared"), Some("from c"));
}

/// Two edges to the same successor still invoke it once
#[test]
fn test_parallel_edges_run_successor_once() {
    let inputs = Arc::new(AtomicUsize::new(0));
    let mut flow = Flow::new();
    let a = flow.add(emit("a", &[("k", Value::from(1))]));
    let probe = Arc::clone(&inputs);
    let b = flow.add(FnPipe::new("b", move |input, _| {
        assert_eq!(input.get_int("k"), Some(1));
        probe.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }));
    flow.connect(a, b).unwrap();
    flow.connect(a, b).unwrap();

    let mut runner = pipeflow::Plumber::translate(&mut flow, &[a]).unwrap();
    assert_eq!(runner.order().len(), 2);
    runner.run().unwrap();
    drop(runner);

    assert_eq!(inputs.load(Ordering::SeqCst), 1);
    assert!(flow.pending_inputs(b).unwrap().is_empty());
}
