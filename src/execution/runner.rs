//! Runner - executes a validated flow in its fixed order

use crate::core::{Flow, FlowError, PipeId};
use crate::execution::listener::FlowListener;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

/// Lifecycle of a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Created,
    Started,
    /// Executing the pipe at this position of the order
    Running(usize),
    Completed,
    Failed,
}

/// Wall-clock timing of one pipe
#[derive(Debug, Clone, Serialize)]
pub struct PipeTiming {
    pub name: String,
    pub elapsed: Duration,
    /// Keys of the produced output, empty when nothing was produced
    pub output_keys: Vec<String>,
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub pipes: Vec<PipeTiming>,
}

/// Drives one pass over a validated order.
///
/// A runner is single-use: once `run` has been called, further calls fail
/// with an invalid-argument error. Translate the flow again to re-execute it.
pub struct Runner<'f> {
    flow: &'f mut Flow,
    order: Vec<PipeId>,
    listeners: Vec<Arc<dyn FlowListener>>,
    state: RunState,
}

impl<'f> Runner<'f> {
    pub(crate) fn new(flow: &'f mut Flow, order: Vec<PipeId>) -> Self {
        Self {
            flow,
            order,
            listeners: Vec::new(),
            state: RunState::Created,
        }
    }

    pub fn add_listener(&mut self, listener: Arc<dyn FlowListener>) {
        self.listeners.push(listener);
    }

    /// Remove a previously added listener, returning whether it was found
    pub fn remove_listener(&mut self, listener: &Arc<dyn FlowListener>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let before = self.listeners.len();
        self.listeners
            .retain(|l| Arc::as_ptr(l) as *const () != target);
        self.listeners.len() != before
    }

    pub fn order(&self) -> &[PipeId] {
        &self.order
    }

    pub fn order_names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|id| self.flow.name(*id).ok())
            .map(str::to_string)
            .collect()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn flow(&self) -> &Flow {
        &*self.flow
    }

    /// Invoke every pipe in order, feeding each output to the pipe's successors
    pub fn run(&mut self) -> Result<RunReport, FlowError> {
        if self.state != RunState::Created {
            return Err(FlowError::InvalidArgument(
                "runner has already been used; translate the flow again to re-run it".to_string(),
            ));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let names = self.order_names();

        info!("Starting run {} over {} pipes", run_id, names.len());
        self.state = RunState::Started;
        for listener in &self.listeners {
            listener.on_start(&names);
        }

        let mut timings = Vec::with_capacity(self.order.len());
        for position in 0..self.order.len() {
            let id = self.order[position];
            let name = &names[position];
            self.state = RunState::Running(position);

            for listener in &self.listeners {
                listener.on_start_generate(name);
            }

            let pipe_clock = Instant::now();
            let output = match self.flow.invoke_with(id, &self.listeners) {
                Ok(output) => output.map(Arc::new),
                Err(err) => {
                    error!("Run {} stopped at {}: {}", run_id, name, err);
                    self.abandon(position);
                    self.state = RunState::Failed;
                    return Err(err);
                }
            };
            let elapsed = pipe_clock.elapsed();

            if let Some(shared) = &output {
                let successors = self.flow.successors(id)?.to_vec();
                for next in successors {
                    self.flow.attach_shared(next, Arc::clone(shared))?;
                }
            }

            for listener in &self.listeners {
                listener.on_finish_generate(name, output.as_deref(), elapsed);
            }
            self.flow.clear_inputs(id)?;

            timings.push(PipeTiming {
                name: name.clone(),
                elapsed,
                output_keys: output
                    .as_deref()
                    .map(|result| result.keys().map(str::to_string).collect())
                    .unwrap_or_default(),
            });
        }

        let elapsed = clock.elapsed();
        self.state = RunState::Completed;
        for listener in &self.listeners {
            listener.on_completion(elapsed);
        }
        info!("Run {} completed in {:.3}s", run_id, elapsed.as_secs_f64());

        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            elapsed,
            pipes: timings,
        })
    }

    /// Drop pending inputs of the failed pipe and everything after it
    fn abandon(&mut self, failed_at: usize) {
        for id in &self.order[failed_at..] {
            if let Err(err) = self.flow.clear_inputs(*id) {
                error!("Cannot clear inputs of {}: {}", id, err);
            }
        }
    }
}
