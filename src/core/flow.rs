//! Flow arena - owns the pipes of a graph and their wiring

use crate::core::error::FlowError;
use crate::core::pipe::{OutputLimit, Pipe, Progress, ProgressGauge};
use crate::core::result::PipeResult;
use crate::execution::listener::FlowListener;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

static NEXT_FLOW_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a pipe inside a [`Flow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipeId {
    flow: u64,
    index: usize,
}

impl PipeId {
    /// Position of the pipe in insertion order
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for PipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

struct Node {
    pipe: Box<dyn Pipe>,
    successors: Vec<PipeId>,
    inputs: Vec<Arc<PipeResult>>,
    gauge: ProgressGauge,
}

/// A set of pipes and the successor edges between them.
///
/// Ids handed out by one flow are rejected by every other flow.
pub struct Flow {
    id: u64,
    nodes: Vec<Node>,
}

impl Flow {
    pub fn new() -> Self {
        Self {
            id: NEXT_FLOW_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
        }
    }

    /// Add a pipe, returning its id
    pub fn add<P: Pipe + 'static>(&mut self, pipe: P) -> PipeId {
        self.add_boxed(Box::new(pipe))
    }

    pub fn add_boxed(&mut self, pipe: Box<dyn Pipe>) -> PipeId {
        let id = PipeId {
            flow: self.id,
            index: self.nodes.len(),
        };
        self.nodes.push(Node {
            pipe,
            successors: Vec::new(),
            inputs: Vec::new(),
            gauge: ProgressGauge::new(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All pipe ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = PipeId> + '_ {
        (0..self.nodes.len()).map(move |index| PipeId {
            flow: self.id,
            index,
        })
    }

    /// Declare `to` as a successor of `from`.
    ///
    /// Connecting the same pair twice adds a second edge. Returns `to` so
    /// chains can be written fluently.
    pub fn connect(&mut self, from: PipeId, to: PipeId) -> Result<PipeId, FlowError> {
        self.slot(to)?;
        let index = self.slot(from)?;
        self.nodes[index].successors.push(to);
        Ok(to)
    }

    /// Connect each pipe to the next one
    pub fn chain(&mut self, ids: &[PipeId]) -> Result<(), FlowError> {
        for pair in ids.windows(2) {
            self.connect(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// Append a pending input to the pipe
    pub fn attach_input(&mut self, id: PipeId, input: PipeResult) -> Result<(), FlowError> {
        self.attach_shared(id, Arc::new(input))
    }

    pub(crate) fn attach_shared(
        &mut self,
        id: PipeId,
        input: Arc<PipeResult>,
    ) -> Result<(), FlowError> {
        let index = self.slot(id)?;
        self.nodes[index].inputs.push(input);
        Ok(())
    }

    pub fn clear_inputs(&mut self, id: PipeId) -> Result<(), FlowError> {
        let index = self.slot(id)?;
        self.nodes[index].inputs.clear();
        Ok(())
    }

    pub fn pending_inputs(&self, id: PipeId) -> Result<&[Arc<PipeResult>], FlowError> {
        Ok(&self.node(id)?.inputs)
    }

    pub fn successors(&self, id: PipeId) -> Result<&[PipeId], FlowError> {
        Ok(&self.node(id)?.successors)
    }

    pub fn name(&self, id: PipeId) -> Result<&str, FlowError> {
        Ok(self.node(id)?.pipe.name())
    }

    pub fn output_limit(&self, id: PipeId) -> Result<OutputLimit, FlowError> {
        Ok(self.node(id)?.pipe.output_limit())
    }

    /// A shared handle on the pipe's gauge, pollable from other threads
    pub fn gauge(&self, id: PipeId) -> Result<ProgressGauge, FlowError> {
        Ok(self.node(id)?.gauge.clone())
    }

    pub fn progress(&self, id: PipeId) -> Result<f32, FlowError> {
        Ok(self.node(id)?.gauge.get())
    }

    /// First pipe with the given name
    pub fn find(&self, name: &str) -> Option<PipeId> {
        self.ids()
            .zip(&self.nodes)
            .find(|(_, node)| node.pipe.name() == name)
            .map(|(id, _)| id)
    }

    /// Invoke a single pipe outside of a runner
    pub fn invoke(&mut self, id: PipeId) -> Result<Option<PipeResult>, FlowError> {
        self.invoke_with(id, &[])
    }

    /// Reset the gauge, merge pending inputs, check the input contract and
    /// produce. Pending inputs are left in place.
    pub(crate) fn invoke_with(
        &mut self,
        id: PipeId,
        listeners: &[Arc<dyn FlowListener>],
    ) -> Result<Option<PipeResult>, FlowError> {
        let index = self.slot(id)?;
        let node = &mut self.nodes[index];
        node.gauge.reset();

        let input = PipeResult::merged(node.inputs.iter().map(|input| &**input));
        let name = node.pipe.name().to_string();
        debug!(
            "Invoking {} with {} input(s), keys {}",
            name,
            node.inputs.len(),
            input
        );

        if let Some(contract) = node.pipe.input_contract() {
            contract
                .check(&input)
                .map_err(|violation| FlowError::Contract {
                    pipe: name.clone(),
                    violation,
                })?;
        }

        let gauge = node.gauge.clone();
        let progress = Progress::new(&name, &gauge, listeners);
        let output = node
            .pipe
            .produce(&input, &progress)
            .map_err(|err| FlowError::from_pipe(&name, err))?;
        gauge.set(1.0);

        Ok(output)
    }

    pub(crate) fn slot(&self, id: PipeId) -> Result<usize, FlowError> {
        if id.flow != self.id || id.index >= self.nodes.len() {
            return Err(FlowError::InvalidArgument(format!(
                "pipe {} does not belong to this flow",
                id
            )));
        }
        Ok(id.index)
    }

    fn node(&self, id: PipeId) -> Result<&Node, FlowError> {
        let index = self.slot(id)?;
        Ok(&self.nodes[index])
    }
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.nodes.iter().map(|n| n.pipe.name()).collect();
        f.debug_struct("Flow")
            .field("id", &self.id)
            .field("pipes", &names)
            .finish()
    }
}
