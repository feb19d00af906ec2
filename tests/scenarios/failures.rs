//! Test: Failure handling - contract and execution failures abort the run

use crate::helpers::*;
use pipeflow::pipes::FnPipe;
use pipeflow::{
    ContractViolation, ErrorKind, Flow, FlowError, InputContract, ParamType, PipeError, Value,
    ValueKind,
};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_contract_violation_stops_before_produce() {
    let produced = Arc::new(AtomicUsize::new(0));
    let after = Arc::new(AtomicUsize::new(0));
    let probe = Arc::clone(&produced);

    let mut flow = Flow::new();
    let seed = flow.add(emit("seed", &[("id", Value::from("not a number"))]));
    let strict = flow.add(
        FnPipe::new("strict", move |_, _| {
            probe.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        })
        .with_contract(InputContract::new().require("id", ParamType::Integer)),
    );
    let tail = flow.add(counting("tail", &after));
    flow.chain(&[seed, strict, tail]).unwrap();

    let (result, recorder) = run_recorded(&mut flow, &[seed]);
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ContractViolation);
    match &err {
        FlowError::Contract { pipe, violation } => {
            assert_eq!(pipe, "strict");
            assert_eq!(
                violation,
                &ContractViolation::TypeMismatch {
                    key: "id".to_string(),
                    expected: ParamType::Integer,
                    actual: ValueKind::Text,
                }
            );
        }
        other => panic!("expected a contract violation, got {:?}", other),
    }
    assert_eq!(produced.load(Ordering::SeqCst), 0);
    assert_eq!(after.load(Ordering::SeqCst), 0);

    assert_eq!(recorder.started(), vec!["seed", "strict"]);
    assert_eq!(recorder.finished(), vec!["seed"]);
    assert!(!recorder.completed());
}

#[test]
fn test_null_required_value_is_rejected() {
    let mut flow = Flow::new();
    let seed = flow.add(emit("seed", &[("id", Value::Null)]));
    let strict = flow.add(
        FnPipe::new("strict", |_, _| Ok(None))
            .with_contract(InputContract::new().require("id", ParamType::Any)),
    );
    flow.connect(seed, strict).unwrap();

    let (result, _) = run_recorded(&mut flow, &[seed]);
    assert!(matches!(
        result.unwrap_err(),
        FlowError::Contract { violation: ContractViolation::Null { .. }, .. }
    ));
}

#[test]
fn test_execution_failure_wraps_cause() {
    let after = Arc::new(AtomicUsize::new(0));
    let mut flow = Flow::new();
    let seed = flow.add(emit("seed", &[]));
    let fetch = flow.add(FnPipe::new("fetch", |_, progress| {
        progress.report(0.3);
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        Err(PipeError::caused_by("upstream unavailable", cause))
    }));
    let tail = flow.add(counting("tail", &after));
    flow.chain(&[seed, fetch, tail]).unwrap();

    let (result, recorder) = run_recorded(&mut flow, &[seed]);
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
    assert_eq!(err.pipe(), Some("fetch"));
    assert_eq!(err.to_string(), "Pipe 'fetch' failed: upstream unavailable");

    let pipe_error = err.source().unwrap();
    let io = pipe_error.source().unwrap();
    assert_eq!(io.to_string(), "refused");

    assert_eq!(after.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.progress_of("fetch"), vec![0.3]);
    assert!(recorder.output_of("fetch").is_none());
    assert!(flow.pending_inputs(tail).unwrap().is_empty());
    assert!(flow.pending_inputs(fetch).unwrap().is_empty());
}

#[test]
fn test_optional_keys_are_type_checked_when_present() {
    let mut flow = Flow::new();
    let seed = flow.add(emit("seed", &[("limit", Value::from("ten"))]));
    let reader = flow.add(
        FnPipe::new("reader", |_, _| Ok(None))
            .with_contract(InputContract::new().optional("limit", ParamType::Integer)),
    );
    flow.connect(seed, reader).unwrap();

    let (result, _) = run_recorded(&mut flow, &[seed]);
    assert_eq!(result.unwrap_err().kind(), ErrorKind::ContractViolation);

    let mut flow = Flow::new();
    let seed = flow.add(emit("seed", &[]));
    let reader = flow.add(
        FnPipe::new("reader", |_, _| Ok(None))
            .with_contract(InputContract::new().optional("limit", ParamType::Integer)),
    );
    flow.connect(seed, reader).unwrap();
    let (result, _) = run_recorded(&mut flow, &[seed]);
    assert!(result.is_ok());
}
