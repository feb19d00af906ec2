//! Listener protocol - observers of a run's lifecycle

use crate::core::PipeResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Receives lifecycle notifications from a [`Runner`](crate::execution::Runner).
///
/// Callbacks run synchronously on the run thread.
pub trait FlowListener: Send + Sync {
    /// The fixed execution order, before anything runs
    fn on_start(&self, order: &[String]);

    fn on_start_generate(&self, pipe: &str);

    /// Milestone reported by the running pipe
    fn on_progress(&self, _pipe: &str, _fraction: f32) {}

    fn on_finish_generate(&self, pipe: &str, result: Option<&PipeResult>, elapsed: Duration);

    fn on_completion(&self, elapsed: Duration);
}

/// Events mirrored from the [`FlowListener`] callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    Started {
        order: Vec<String>,
    },
    PipeStarted {
        pipe: String,
    },
    Progress {
        pipe: String,
        fraction: f32,
    },
    PipeFinished {
        pipe: String,
        output: Option<PipeResult>,
        elapsed: Duration,
    },
    Completed {
        elapsed: Duration,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(FlowEvent) + Send + Sync>;

/// Adapts a closure into a [`FlowListener`]
pub struct EventHandlerListener {
    handler: EventHandler,
}

impl EventHandlerListener {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(FlowEvent) + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }

    fn emit(&self, event: FlowEvent) {
        (self.handler)(event);
    }
}

impl FlowListener for EventHandlerListener {
    fn on_start(&self, order: &[String]) {
        self.emit(FlowEvent::Started {
            order: order.to_vec(),
        });
    }

    fn on_start_generate(&self, pipe: &str) {
        self.emit(FlowEvent::PipeStarted {
            pipe: pipe.to_string(),
        });
    }

    fn on_progress(&self, pipe: &str, fraction: f32) {
        self.emit(FlowEvent::Progress {
            pipe: pipe.to_string(),
            fraction,
        });
    }

    fn on_finish_generate(&self, pipe: &str, result: Option<&PipeResult>, elapsed: Duration) {
        self.emit(FlowEvent::PipeFinished {
            pipe: pipe.to_string(),
            output: result.cloned(),
            elapsed,
        });
    }

    fn on_completion(&self, elapsed: Duration) {
        self.emit(FlowEvent::Completed { elapsed });
    }
}

/// Writes lifecycle events to `tracing`
#[derive(Debug, Default)]
pub struct TracingListener;

impl FlowListener for TracingListener {
    fn on_start(&self, order: &[String]) {
        info!("Running {} pipes: {}", order.len(), order.join(" -> "));
    }

    fn on_start_generate(&self, pipe: &str) {
        info!("Starting {}", pipe);
    }

    fn on_progress(&self, pipe: &str, fraction: f32) {
        debug!("{} progress {:.0}%", pipe, fraction * 100.0);
    }

    fn on_finish_generate(&self, pipe: &str, result: Option<&PipeResult>, elapsed: Duration) {
        match result {
            Some(result) => info!(
                "Finished {} in {:.3}s with keys {}",
                pipe,
                elapsed.as_secs_f64(),
                result
            ),
            None => info!(
                "Finished {} in {:.3}s without output",
                pipe,
                elapsed.as_secs_f64()
            ),
        }
    }

    fn on_completion(&self, elapsed: Duration) {
        info!("Flow completed in {:.3}s", elapsed.as_secs_f64());
    }
}
