//! Core domain models for pipeflow
//!
//! This module defines the values passed between pipes, the pipe contract,
//! the flow arena that owns a graph of pipes, and the YAML configuration
//! that assembles one.

pub mod config;
pub mod contract;
pub mod error;
pub mod flow;
pub mod pipe;
pub mod result;
pub mod value;

pub use contract::*;
pub use error::*;
pub use flow::*;
pub use pipe::*;
pub use result::*;
pub use value::*;
