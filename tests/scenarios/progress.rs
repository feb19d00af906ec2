//! Test: Progress - milestones reach listeners and the gauge is readable across threads

use crate::helpers::*;
use pipeflow::pipes::FnPipe;
use pipeflow::Flow;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

#[test]
fn test_milestones_reach_listeners_in_order() {
    let mut flow = Flow::new();
    let seed = flow.add(emit("seed", &[]));
    let work = flow.add(FnPipe::new("work", |_, progress| {
        for done in 1..=4 {
            progress.report_items(done, 4);
        }
        progress.report(7.0);
        Ok(None)
    }));
    flow.connect(seed, work).unwrap();

    let (result, recorder) = run_recorded(&mut flow, &[seed]);
    result.unwrap();

    assert_eq!(recorder.progress_of("work"), vec![0.25, 0.5, 0.75, 1.0, 1.0]);
    assert!(recorder.progress_of("seed").is_empty());
    assert_eq!(flow.progress(work).unwrap(), 1.0);
}

#[test]
fn test_gauge_polled_from_another_thread() {
    let (reached_tx, reached_rx) = mpsc::channel::<()>();
    let (resume_tx, resume_rx) = mpsc::channel::<()>();

    let mut flow = Flow::new();
    let work = flow.add(FnPipe::new("work", move |_, progress| {
        progress.report(0.5);
        reached_tx.send(()).unwrap();
        resume_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        Ok(None)
    }));
    let gauge = flow.gauge(work).unwrap();

    let observer = thread::spawn(move || {
        reached_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let seen = gauge.get();
        resume_tx.send(()).unwrap();
        seen
    });

    let (result, _) = run_recorded(&mut flow, &[work]);
    result.unwrap();

    assert_eq!(observer.join().unwrap(), 0.5);
    assert_eq!(flow.progress(work).unwrap(), 1.0);
}

#[test]
fn test_gauge_resets_at_each_invocation() {
    let mut flow = Flow::new();
    let work = flow.add(FnPipe::new("work", |_, progress| {
        assert_eq!(progress.current(), 0.0);
        progress.report(0.4);
        Ok(None)
    }));

    flow.invoke(work).unwrap();
    assert_eq!(flow.progress(work).unwrap(), 1.0);
    flow.invoke(work).unwrap();
    assert_eq!(flow.progress(work).unwrap(), 1.0);
}
