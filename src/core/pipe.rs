//! The processing unit contract and its progress gauge

use crate::core::contract::InputContract;
use crate::core::error::PipeError;
use crate::core::result::PipeResult;
use crate::execution::listener::FlowListener;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Maximum number of successor edges a pipe may have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLimit {
    #[default]
    Unbounded,
    AtMost(usize),
}

impl OutputLimit {
    /// Whether `count` successors are allowed
    pub fn allows(self, count: usize) -> bool {
        match self {
            OutputLimit::Unbounded => true,
            OutputLimit::AtMost(limit) => count <= limit,
        }
    }
}

impl fmt::Display for OutputLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputLimit::Unbounded => f.write_str("unbounded"),
            OutputLimit::AtMost(limit) => write!(f, "{}", limit),
        }
    }
}

/// A processing unit.
///
/// Implementations only supply the production logic; input merging, contract
/// checks and progress bookkeeping are handled by the owning
/// [`Flow`](crate::core::Flow).
pub trait Pipe: Send {
    /// Identity used in logs, errors and graph output
    fn name(&self) -> &str;

    fn output_limit(&self) -> OutputLimit {
        OutputLimit::Unbounded
    }

    /// Schema the merged input must satisfy before [`produce`](Pipe::produce) runs
    fn input_contract(&self) -> Option<&InputContract> {
        None
    }

    /// Consume the merged input and produce zero or one output
    fn produce(
        &mut self,
        input: &PipeResult,
        progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError>;
}

/// Thread-safe 0.0 to 1.0 completion gauge.
///
/// Clones share the same cell, so an observer thread can poll a clone while the
/// run thread writes.
#[derive(Clone, Default)]
pub struct ProgressGauge {
    bits: Arc<AtomicU32>,
}

impl ProgressGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Store `fraction`, clamped to [0, 1]; NaN is stored as 0
    pub fn set(&self, fraction: f32) {
        let clamped = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.bits.store(clamped.to_bits(), Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.set(0.0);
    }
}

impl fmt::Debug for ProgressGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgressGauge({:.2})", self.get())
    }
}

/// Progress reporter handed to [`Pipe::produce`]
pub struct Progress<'a> {
    pipe: &'a str,
    gauge: &'a ProgressGauge,
    listeners: &'a [Arc<dyn FlowListener>],
}

impl<'a> Progress<'a> {
    pub(crate) fn new(
        pipe: &'a str,
        gauge: &'a ProgressGauge,
        listeners: &'a [Arc<dyn FlowListener>],
    ) -> Self {
        Self {
            pipe,
            gauge,
            listeners,
        }
    }

    /// Record a milestone and notify listeners
    pub fn report(&self, fraction: f32) {
        self.gauge.set(fraction);
        let stored = self.gauge.get();
        debug!("{} at {:.0}%", self.pipe, stored * 100.0);
        for listener in self.listeners {
            listener.on_progress(self.pipe, stored);
        }
    }

    /// Convenience for `report(done / total)`; a zero total counts as complete
    pub fn report_items(&self, done: usize, total: usize) {
        if total == 0 {
            self.report(1.0);
        } else {
            self.report(done as f32 / total as f32);
        }
    }

    pub fn current(&self) -> f32 {
        self.gauge.get()
    }

    pub fn pipe(&self) -> &str {
        self.pipe
    }
}
