//! Error types for flow validation and execution

use crate::core::contract::ParamType;
use crate::core::value::ValueKind;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Broad category of a [`FlowError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    StructuralViolation,
    ContractViolation,
    ExecutionFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::StructuralViolation => "structural violation",
            ErrorKind::ContractViolation => "contract violation",
            ErrorKind::ExecutionFailure => "execution failure",
        };
        f.write_str(name)
    }
}

/// Errors returned by `translate` and `run`
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid flow: {0}")]
    Structural(#[from] StructuralViolation),

    #[error("Pipe '{pipe}' rejected its input: {violation}")]
    Contract {
        pipe: String,
        #[source]
        violation: ContractViolation,
    },

    #[error("Pipe '{pipe}' failed: {source}")]
    Execution {
        pipe: String,
        #[source]
        source: PipeError,
    },
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            FlowError::Structural(_) => ErrorKind::StructuralViolation,
            FlowError::Contract { .. } => ErrorKind::ContractViolation,
            FlowError::Execution { .. } => ErrorKind::ExecutionFailure,
        }
    }

    /// Name of the pipe the error is attributed to, if any
    pub fn pipe(&self) -> Option<&str> {
        match self {
            FlowError::Contract { pipe, .. } | FlowError::Execution { pipe, .. } => {
                Some(pipe.as_str())
            }
            FlowError::Structural(StructuralViolation::OutputLimitExceeded { pipe, .. }) => {
                Some(pipe.as_str())
            }
            _ => None,
        }
    }

    pub(crate) fn from_pipe(pipe: &str, err: PipeError) -> Self {
        match err {
            PipeError::Contract(violation) => FlowError::Contract {
                pipe: pipe.to_string(),
                violation,
            },
            other => FlowError::Execution {
                pipe: pipe.to_string(),
                source: other,
            },
        }
    }
}

/// The assembled graph cannot be executed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralViolation {
    #[error("pipe '{pipe}' has {actual} outputs but allows at most {limit}")]
    OutputLimitExceeded {
        pipe: String,
        limit: usize,
        actual: usize,
    },

    #[error("cycle between pipes [{}]", .pipes.join(", "))]
    Cycle { pipes: Vec<String> },

    #[error("flow splits into {} disconnected parts: {}", .components.len(), format_components(.components))]
    Disconnected { components: Vec<Vec<String>> },
}

fn format_components(components: &[Vec<String>]) -> String {
    components
        .iter()
        .map(|c| format!("[{}]", c.join(", ")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A merged input does not satisfy a pipe's input contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("required key '{key}' is missing")]
    Missing { key: String },

    #[error("required key '{key}' is null")]
    Null { key: String },

    #[error("key '{key}' should be {expected} but is {actual}")]
    TypeMismatch {
        key: String,
        expected: ParamType,
        actual: ValueKind,
    },
}

/// Failures raised by a pipe's production logic
#[derive(Debug, Error)]
pub enum PipeError {
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl PipeError {
    /// A domain failure without an underlying cause
    pub fn failed(message: impl Into<String>) -> Self {
        PipeError::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// A domain failure wrapping its originating cause
    pub fn caused_by<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        PipeError::Failed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
