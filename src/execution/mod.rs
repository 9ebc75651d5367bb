//! Relay execution: the transform pipeline and the engine around it

pub mod engine;
pub mod runner;

pub use engine::{convert_file, EventHandler, ExecutionEngine, ExecutionEvent, RelayError};
pub use runner::{FileSink, Sink, TransformPipeline};
