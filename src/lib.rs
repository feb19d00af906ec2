//! pipeflow - validate, order and run synchronous dataflow graphs of pipes

pub mod cli;
pub mod core;
pub mod execution;
pub mod pipes;

// Re-export commonly used types
pub use core::{
    ContractViolation, ErrorKind, Flow, FlowError, Handle, InputContract, OutputLimit, ParamType,
    Pipe, PipeError, PipeId, PipeResult, Progress, ProgressGauge, StructuralViolation, Value,
    ValueKind,
};
pub use execution::{FlowEvent, FlowListener, Plumber, RunReport, RunState, Runner};
