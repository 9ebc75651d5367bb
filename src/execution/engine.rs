//! Main execution engine - drives one relay run from fetch to archive

use crate::{
    core::{ExecutionStatus, RelayConfig, RunState, StepKind},
    execution::runner::{FileSink, TransformPipeline},
    fetch::{FetchError, Fetcher},
    persistence::{self, Archiver, PersistError, ZipArchiver},
    stage::{PipelineError, ThrottleStage},
};
use bytes::Bytes;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Any error that ends a run
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: Uuid,
        url: String,
    },
    StepStarted {
        step: StepKind,
    },
    StepCompleted {
        step: StepKind,
    },
    StepFailed {
        step: StepKind,
        error: String,
    },
    StepSkipped {
        step: StepKind,
    },
    RunCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Runs fetch → transform → persist → archive, strictly in that order
///
/// Each step starts only after the previous one succeeded. The first failure
/// marks the remaining steps skipped and is returned as is.
pub struct ExecutionEngine<F> {
    fetcher: F,
    archiver: Arc<dyn Archiver>,
    throttle: ThrottleStage,
    config: RelayConfig,
    event_handlers: Vec<EventHandler>,
}

impl<F: Fetcher> ExecutionEngine<F> {
    pub fn new(fetcher: F, config: RelayConfig) -> Self {
        Self {
            fetcher,
            archiver: Arc::new(ZipArchiver::new()),
            throttle: ThrottleStage::default(),
            config,
            event_handlers: Vec::new(),
        }
    }

    /// Replace the archive backend
    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Replace the throttle stage (tests use a shorter delay)
    pub fn with_throttle(mut self, throttle: ThrottleStage) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Add an event handler
    pub fn add_event_handler<H>(&mut self, handler: H)
    where
        H: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the whole run
    pub async fn execute(&self, state: &mut RunState) -> Result<(), RelayError> {
        let execution_id = state.execution_id;
        let url = self.config.url();

        info!("Starting relay run {} for {}", execution_id, url);
        self.emit_event(ExecutionEvent::RunStarted {
            execution_id,
            url,
        });
        state.start();

        let xml_path = self.config.xml_path();
        let json_path = self.config.json_path();
        let archive_path = self.config.archive_path();

        let payload: Bytes = self
            .run_step(
                state,
                StepKind::Fetch,
                self.fetcher.fetch(&self.config.host, &self.config.path),
            )
            .await?;

        // The payload is shared read-only between the pipeline and the JSON copy
        self.run_step(
            state,
            StepKind::Transform,
            TransformPipeline::new(self.throttle.clone())
                .run(payload.clone(), FileSink::new(&xml_path)),
        )
        .await?;
        info!("Data saved to {}", xml_path.display());

        self.run_step(
            state,
            StepKind::Persist,
            persistence::write_file(&json_path, &payload),
        )
        .await?;
        info!("Data saved to {}", json_path.display());

        self.run_step(
            state,
            StepKind::Archive,
            self.archiver
                .archive(&[xml_path.clone(), json_path.clone()], &archive_path),
        )
        .await?;
        info!("Files compressed and saved as {}", archive_path.display());

        state.complete();
        info!("Relay run {} finished: {:?}", execution_id, state.status);
        self.emit_event(ExecutionEvent::RunCompleted {
            execution_id,
            status: ExecutionStatus::Completed,
        });

        Ok(())
    }

    /// Await one step, recording its outcome in `state`
    async fn run_step<T, E, Fut>(
        &self,
        state: &mut RunState,
        step: StepKind,
        work: Fut,
    ) -> Result<T, RelayError>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Into<RelayError>,
    {
        state.start_step(step);
        self.emit_event(ExecutionEvent::StepStarted { step });

        match work.await {
            Ok(value) => {
                state.complete_step(step);
                self.emit_event(ExecutionEvent::StepCompleted { step });
                Ok(value)
            }
            Err(e) => {
                let e: RelayError = e.into();
                error!("Step {} failed: {}", step, e);

                let skipped = state.fail_step(step, e.to_string());
                self.emit_event(ExecutionEvent::StepFailed {
                    step,
                    error: e.to_string(),
                });
                for later in skipped {
                    self.emit_event(ExecutionEvent::StepSkipped { step: later });
                }

                state.fail();
                self.emit_event(ExecutionEvent::RunCompleted {
                    execution_id: state.execution_id,
                    status: ExecutionStatus::Failed,
                });
                Err(e)
            }
        }
    }
}

/// Convert a local JSON file into an XML file through the transform pipeline
pub async fn convert_file(
    input: &Path,
    output: &Path,
    throttle: ThrottleStage,
) -> Result<(), RelayError> {
    let payload = tokio::fs::read(input)
        .await
        .map_err(|source| PersistError::Read {
            path: input.to_path_buf(),
            source,
        })?;

    TransformPipeline::new(throttle)
        .run(Bytes::from(payload), FileSink::new(output))
        .await?;
    info!("Converted {} into {}", input.display(), output.display());
    Ok(())
}
