//! relay - fetch a JSON document, convert it to XML through a throttled
//! pipeline, and archive both representations

pub mod cli;
pub mod core;
pub mod execution;
pub mod fetch;
pub mod persistence;
pub mod stage;

// Re-export commonly used types
pub use core::{ExecutionStatus, RelayConfig, RunState, StepKind, StepState};
pub use execution::{ExecutionEngine, ExecutionEvent, RelayError, TransformPipeline};
pub use fetch::{FetchError, Fetcher, FetcherConfig, HttpFetcher};
pub use persistence::{Archiver, PersistError, ZipArchiver};
pub use stage::{ConversionError, PipelineError, Stage, StageError};
