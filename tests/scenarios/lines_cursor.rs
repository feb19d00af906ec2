//! Test: Line cursors - a single-use output feeding exactly one consumer

use crate::helpers::*;
use pipeflow::pipes::{CapturePipe, CollectPipe, LinesPipe};
use pipeflow::{ErrorKind, Flow, Value};
use std::io::Write;

fn rows_file(lines: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for n in 0..lines {
        writeln!(file, "row {}", n).unwrap();
    }
    file
}

#[test]
fn test_lines_are_collected_downstream() {
    let file = rows_file(200);
    let mut flow = Flow::new();
    let seed = flow.add(emit("seed", &[("source", Value::from("rows"))]));
    let lines = flow.add(LinesPipe::new("lines", file.path(), "cursor"));
    let collect = flow.add(CollectPipe::new("collect", "cursor", "rows"));
    let capture = CapturePipe::new("sink");
    let seen = capture.handle();
    let sink = flow.add(capture);
    flow.chain(&[seed, lines, collect, sink]).unwrap();

    let (result, recorder) = run_recorded(&mut flow, &[seed]);
    result.unwrap();

    let input = seen.last().unwrap();
    let rows = input.get_list("rows").unwrap();
    assert_eq!(rows.len(), 200);
    assert_eq!(rows[0], Value::from("row 0"));
    assert_eq!(rows[199], Value::from("row 199"));
    assert_eq!(input.get_text("source"), Some("rows"));
    assert!(!input.exists("cursor"));

    let progress = recorder.progress_of("collect");
    assert_eq!(progress.len(), 3);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_cursor_cannot_fan_out() {
    let file = rows_file(3);
    let mut flow = Flow::new();
    let lines = flow.add(LinesPipe::new("lines", file.path(), "cursor"));
    let first = flow.add(CollectPipe::new("first", "cursor", "rows"));
    let second = flow.add(CollectPipe::new("second", "cursor", "rows"));
    flow.connect(lines, first).unwrap();
    flow.connect(lines, second).unwrap();

    let (result, recorder) = run_recorded(&mut flow, &[lines]);
    let err = result.unwrap_err();
    assert_output_limit(&err, "lines", 1, 2);
    assert!(recorder.started().is_empty());
}

#[test]
fn test_missing_file_aborts_the_run() {
    let mut flow = Flow::new();
    let lines = flow.add(LinesPipe::new("lines", "/no/such/rows.txt", "cursor"));
    let collect = flow.add(CollectPipe::new("collect", "cursor", "rows"));
    flow.connect(lines, collect).unwrap();

    let (result, recorder) = run_recorded(&mut flow, &[lines]);
    assert_eq!(result.unwrap_err().kind(), ErrorKind::ExecutionFailure);
    assert_eq!(recorder.started(), vec!["lines"]);
}
