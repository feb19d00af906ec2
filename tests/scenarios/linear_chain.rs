//! Test: Linear chain - outputs flow from each pipe into the next

use crate::helpers::*;
use pipeflow::execution::Plumber;
use pipeflow::pipes::{CapturePipe, FnPipe};
use pipeflow::{Flow, InputContract, ParamType, PipeResult, Value};

fn increment() -> FnPipe {
    FnPipe::new("increment", |input, _| {
        let x = input.get_int("x").unwrap_or_default();
        Ok(Some(PipeResult::new().with("y", x + 1)))
    })
    .with_contract(InputContract::new().require("x", ParamType::Integer))
}

/// Three pipes x -> y: the last one sees y = 2
#[test]
fn test_value_propagates_down_the_chain() {
    let mut flow = Flow::new();
    let seed = flow.add(emit("seed", &[("x", Value::from(1))]));
    let inc = flow.add(increment());
    let capture = CapturePipe::new("read_y")
        .with_contract(InputContract::new().require("y", ParamType::Integer));
    let seen = capture.handle();
    let read = flow.add(capture);
    flow.chain(&[seed, inc, read]).unwrap();

    let (result, recorder) = run_recorded(&mut flow, &[seed]);
    let report = result.unwrap();

    assert_eq!(seen.count(), 1);
    let input = seen.last().unwrap();
    assert_eq!(input.get_int("y"), Some(2));
    assert!(!input.exists("x"));

    assert_eq!(recorder.announced_order(), vec!["seed", "increment", "read_y"]);
    assert_eq!(recorder.started(), recorder.finished());
    assert!(recorder.completed());
    assert_eq!(report.pipes.len(), 3);
    assert_eq!(report.pipes[1].output_keys, vec!["y"]);
}

/// Every pipe's pending inputs are consumed by the run
#[test]
fn test_inputs_cleared_after_run() {
    let mut flow = Flow::new();
    let seed = flow.add(emit("seed", &[("x", Value::from(1))]));
    let inc = flow.add(increment());
    let sink = flow.add(CapturePipe::new("sink"));
    flow.chain(&[seed, inc, sink]).unwrap();
    flow.attach_input(seed, PipeResult::new().with("seeded", true))
        .unwrap();

    let (result, _) = run_recorded(&mut flow, &[seed]);
    result.unwrap();

    for id in [seed, inc, sink] {
        assert!(flow.pending_inputs(id).unwrap().is_empty());
        assert_eq!(flow.progress(id).unwrap(), 1.0);
    }
}

/// Translating an unchanged flow twice fixes the same order
#[test]
fn test_translate_is_deterministic() {
    let mut flow = Flow::new();
    let ids: Vec<_> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|name| flow.add(emit(name, &[])))
        .collect();
    flow.connect(ids[0], ids[3]).unwrap();
    flow.connect(ids[0], ids[1]).unwrap();
    flow.connect(ids[1], ids[4]).unwrap();
    flow.connect(ids[3], ids[4]).unwrap();
    flow.connect(ids[0], ids[2]).unwrap();

    let first = Plumber::translate(&mut flow, &[ids[0]]).unwrap().order_names();
    let second = Plumber::translate(&mut flow, &[ids[0]]).unwrap().order_names();
    assert_eq!(first, second);
    assert_eq!(first, vec!["a", "d", "b", "e", "c"]);
}
