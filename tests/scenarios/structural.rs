//! Test: Structural validation - invalid graphs are rejected before anything runs

use crate::helpers::*;
use pipeflow::execution::Plumber;
use pipeflow::pipes::{FnPipe, VoidPipe};
use pipeflow::{ErrorKind, Flow, OutputLimit, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_cycle_is_rejected_without_invoking() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut flow = Flow::new();
    let start = flow.add(counting("start", &calls));
    let load = flow.add(counting("load", &calls));
    let transform = flow.add(counting("transform", &calls));
    let store = flow.add(counting("store", &calls));
    flow.chain(&[start, load, transform, store]).unwrap();
    flow.connect(store, load).unwrap();

    let (result, recorder) = run_recorded(&mut flow, &[start]);
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    assert_cycle(&err, &["load", "transform", "store"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(recorder.events().is_empty());
}

#[test]
fn test_cycle_through_the_root() {
    let mut flow = Flow::new();
    let a = flow.add(VoidPipe::new("a"));
    let b = flow.add(VoidPipe::new("b"));
    flow.connect(a, b).unwrap();
    flow.connect(b, a).unwrap();

    let err = Plumber::validate(&flow, &[a]).unwrap_err();
    assert_cycle(&err, &["a", "b"]);
}

#[test]
fn test_disjoint_roots_are_rejected() {
    let mut flow = Flow::new();
    let left = flow.add(emit("left", &[("k", Value::from(1))]));
    let left_sink = flow.add(VoidPipe::new("left_sink"));
    let right = flow.add(emit("right", &[("k", Value::from(2))]));
    let right_sink = flow.add(VoidPipe::new("right_sink"));
    flow.connect(left, left_sink).unwrap();
    flow.connect(right, right_sink).unwrap();

    let err = Plumber::validate(&flow, &[left, right]).unwrap_err();
    assert_disconnected(&err, 2);
    assert!(err.to_string().contains("[left, left_sink] [right, right_sink]"));

    // Joining the branches makes the same roots valid
    let join = flow.add(VoidPipe::new("join"));
    flow.connect(left_sink, join).unwrap();
    flow.connect(right, join).unwrap();
    let order = Plumber::validate(&flow, &[left, right]).unwrap();
    assert_eq!(order.len(), 5);
}

#[test]
fn test_output_limit_fails_before_any_invoke() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut flow = Flow::new();
    let seed = flow.add(counting("seed", &calls));
    let cursor = flow.add(
        FnPipe::new("cursor", |input, _| Ok(Some(input.clone())))
            .with_output_limit(OutputLimit::AtMost(1)),
    );
    let first = flow.add(counting("first", &calls));
    let second = flow.add(counting("second", &calls));
    flow.connect(seed, cursor).unwrap();
    flow.connect(cursor, first).unwrap();
    flow.connect(cursor, second).unwrap();

    let (result, _) = run_recorded(&mut flow, &[seed]);
    let err = result.unwrap_err();

    assert_output_limit(&err, "cursor", 1, 2);
    assert_eq!(err.pipe(), Some("cursor"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_zero_output_limit_allows_a_sink() {
    let mut flow = Flow::new();
    let seed = flow.add(emit("seed", &[]));
    let sink = flow.add(
        FnPipe::new("sink", |_, _| Ok(None)).with_output_limit(OutputLimit::AtMost(0)),
    );
    flow.connect(seed, sink).unwrap();
    assert!(Plumber::validate(&flow, &[seed]).is_ok());

    let after = flow.add(VoidPipe::new("after"));
    flow.connect(sink, after).unwrap();
    let err = Plumber::validate(&flow, &[seed]).unwrap_err();
    assert_output_limit(&err, "sink", 0, 1);
}

#[test]
fn test_no_roots_is_invalid_argument() {
    let mut flow = Flow::new();
    flow.add(VoidPipe::new("lonely"));
    let err = Plumber::translate(&mut flow, &[]).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_foreign_root_is_invalid_argument() {
    let mut other = Flow::new();
    let foreign = other.add(VoidPipe::new("foreign"));
    let flow = Flow::new();
    let err = Plumber::validate(&flow, &[foreign]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}
