//! General-purpose pipes: sinks, constants and closures

use crate::core::{InputContract, OutputLimit, Pipe, PipeError, PipeResult, Progress};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Consumes its inputs and produces nothing
#[derive(Debug, Clone)]
pub struct VoidPipe {
    name: String,
}

impl VoidPipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Pipe for VoidPipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn produce(
        &mut self,
        _input: &PipeResult,
        _progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError> {
        Ok(None)
    }
}

/// Shared view of everything a [`CapturePipe`] received, one entry per invocation
#[derive(Clone, Default)]
pub struct CaptureHandle {
    seen: Arc<Mutex<Vec<PipeResult>>>,
}

impl CaptureHandle {
    fn lock(&self) -> MutexGuard<'_, Vec<PipeResult>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merged input of the most recent invocation
    pub fn last(&self) -> Option<PipeResult> {
        self.lock().last().cloned()
    }

    pub fn all(&self) -> Vec<PipeResult> {
        self.lock().clone()
    }

    /// Number of invocations recorded
    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

impl fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaptureHandle({} captured)", self.count())
    }
}

/// Records its merged input and produces nothing
#[derive(Debug)]
pub struct CapturePipe {
    name: String,
    handle: CaptureHandle,
    contract: Option<InputContract>,
}

impl CapturePipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: CaptureHandle::default(),
            contract: None,
        }
    }

    pub fn with_contract(mut self, contract: InputContract) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Handle to read captured inputs after the pipe has moved into a flow
    pub fn handle(&self) -> CaptureHandle {
        self.handle.clone()
    }
}

impl Pipe for CapturePipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_contract(&self) -> Option<&InputContract> {
        self.contract.as_ref()
    }

    fn produce(
        &mut self,
        input: &PipeResult,
        _progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError> {
        self.handle.lock().push(input.clone());
        Ok(None)
    }
}

/// Emits a fixed set of values
#[derive(Debug, Clone)]
pub struct ConstantPipe {
    name: String,
    values: PipeResult,
    passthrough: bool,
}

impl ConstantPipe {
    pub fn new(name: impl Into<String>, values: PipeResult) -> Self {
        Self {
            name: name.into(),
            values,
            passthrough: false,
        }
    }

    /// Also forward the merged input; the constants win on collision
    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }
}

impl Pipe for ConstantPipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn produce(
        &mut self,
        input: &PipeResult,
        _progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError> {
        if self.passthrough {
            let mut output = input.clone();
            output.merge(&self.values);
            Ok(Some(output))
        } else {
            Ok(Some(self.values.clone()))
        }
    }
}

type ProduceFn =
    Box<dyn FnMut(&PipeResult, &Progress<'_>) -> Result<Option<PipeResult>, PipeError> + Send>;

/// Wraps a closure as a pipe
pub struct FnPipe {
    name: String,
    func: ProduceFn,
    output_limit: OutputLimit,
    contract: Option<InputContract>,
}

impl FnPipe {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: FnMut(&PipeResult, &Progress<'_>) -> Result<Option<PipeResult>, PipeError>
            + Send
            + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
            output_limit: OutputLimit::Unbounded,
            contract: None,
        }
    }

    pub fn with_output_limit(mut self, limit: OutputLimit) -> Self {
        self.output_limit = limit;
        self
    }

    pub fn with_contract(mut self, contract: InputContract) -> Self {
        self.contract = Some(contract);
        self
    }
}

impl fmt::Debug for FnPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPipe")
            .field("name", &self.name)
            .field("output_limit", &self.output_limit)
            .finish()
    }
}

impl Pipe for FnPipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_limit(&self) -> OutputLimit {
        self.output_limit
    }

    fn input_contract(&self) -> Option<&InputContract> {
        self.contract.as_ref()
    }

    fn produce(
        &mut self,
        input: &PipeResult,
        progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError> {
        (self.func)(input, progress)
    }
}
