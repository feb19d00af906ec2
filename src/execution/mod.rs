//! Flow validation and execution

pub mod listener;
pub mod plumber;
pub mod runner;

pub use listener::{EventHandler, EventHandlerListener, FlowEvent, FlowListener, TracingListener};
pub use plumber::Plumber;
pub use runner::{PipeTiming, RunReport, RunState, Runner};
