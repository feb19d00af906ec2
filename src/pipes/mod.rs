//! Built-in pipes

pub mod basic;
pub mod lines;
pub mod transform;

pub use basic::{CaptureHandle, CapturePipe, ConstantPipe, FnPipe, VoidPipe};
pub use lines::{CollectPipe, LineCursor, LinesPipe};
pub use transform::{ExtractPipe, RenamePipe, TemplatePipe};
