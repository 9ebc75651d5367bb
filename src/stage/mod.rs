//! Pipeline stages
//!
//! A stage has one input and one output. Stages are connected by bounded
//! channels carrying [`Signal`]s: a chunk, or the error that ended the
//! pipeline upstream. Closing a stage's sender is the close signal.
//!
//! [`drive`] runs one stage against its channels and enforces the
//! propagation rules every stage shares:
//!
//! - chunks are handed to the stage in arrival order, one at a time
//! - an upstream error is forwarded at once, without waiting for the stage
//!   to become ready
//! - a stage error is wrapped with the stage name and forwarded instead of
//!   any further output
//! - when the input closes the stage is given a chance to flush, then its
//!   output closes

pub mod convert;
pub mod throttle;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub use convert::{ConversionError, ConvertStage};
pub use throttle::ThrottleStage;

/// The unit moved between stages
pub type Chunk = Bytes;

/// What travels over a channel between two stages
pub type Signal = Result<Chunk, PipelineError>;

/// Channel capacity between stages
///
/// Keeps at most one chunk queued ahead of any stage.
pub const CHANNEL_CAPACITY: usize = 1;

/// Errors raised inside a stage
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The downstream side stopped receiving before the pipeline drained
    #[error("downstream of {0} closed before the pipeline drained")]
    Closed(&'static str),
}

/// A stage error surfaced through the pipeline, tagged with its origin
#[derive(Debug, Error)]
#[error("pipeline stage '{stage}' failed: {source}")]
pub struct PipelineError {
    /// Name of the stage the error originated in
    pub stage: &'static str,

    #[source]
    pub source: StageError,
}

impl PipelineError {
    pub fn new(stage: &'static str, source: StageError) -> Self {
        Self { stage, source }
    }
}

/// Create a channel for connecting two stages
pub fn channel() -> (mpsc::Sender<Signal>, mpsc::Receiver<Signal>) {
    mpsc::channel(CHANNEL_CAPACITY)
}

/// Output side of a stage
pub struct Outlet {
    stage: &'static str,
    tx: mpsc::Sender<Signal>,
}

impl Outlet {
    pub fn new(stage: &'static str, tx: mpsc::Sender<Signal>) -> Self {
        Self { stage, tx }
    }

    /// Forward a chunk downstream, waiting for room in the channel
    pub async fn send(&self, chunk: Chunk) -> Result<(), StageError> {
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| StageError::Closed(self.stage))
    }

    /// Resolves once the downstream side has gone away
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    async fn fail(&self, error: PipelineError) {
        // Nobody is left to tell if this fails
        let _ = self.tx.send(Err(error)).await;
    }
}

/// A processing unit with exactly one input and one output
///
/// Implementations must not drop, reorder or duplicate chunks.
#[async_trait]
pub trait Stage: Send {
    /// Name used in logs and error reports
    fn name(&self) -> &'static str;

    /// Wait until the stage may accept another chunk
    ///
    /// This is the backpressure hook: the runner holds the next chunk (or the
    /// close signal) until this resolves. Errors never wait on it.
    async fn ready(&mut self) {}

    /// Handle one chunk, forwarding whatever it produces to `out`
    async fn process(&mut self, chunk: Chunk, out: &Outlet) -> Result<(), StageError>;

    /// Called once after the input closed cleanly
    async fn finish(&mut self, _out: &Outlet) -> Result<(), StageError> {
        Ok(())
    }
}

/// Run `stage` until its input closes or an error ends the pipeline
///
/// Returning drops both channel ends, which closes the downstream stage and
/// makes any further upstream send fail. A stage also stops as soon as its
/// downstream has gone, even while it waits for input or for `ready`.
pub async fn drive<S: Stage>(
    mut stage: S,
    mut input: mpsc::Receiver<Signal>,
    output: mpsc::Sender<Signal>,
) {
    let name = stage.name();
    let outlet = Outlet::new(name, output);
    let mut forwarded = 0usize;

    loop {
        let signal = tokio::select! {
            signal = input.recv() => signal,
            _ = outlet.closed() => {
                debug!("Stage {} stopped: downstream closed", name);
                return;
            }
        };

        match signal {
            Some(Ok(chunk)) => {
                if !ready_or_closed(&mut stage, &outlet).await {
                    return;
                }
                debug!("Stage {} accepted chunk {} ({} bytes)", name, forwarded, chunk.len());
                if let Err(e) = stage.process(chunk, &outlet).await {
                    report(name, e, &outlet).await;
                    return;
                }
                forwarded += 1;
            }
            Some(Err(upstream)) => {
                debug!("Stage {} forwarding upstream error from {}", name, upstream.stage);
                outlet.fail(upstream).await;
                return;
            }
            None => {
                if !ready_or_closed(&mut stage, &outlet).await {
                    return;
                }
                if let Err(e) = stage.finish(&outlet).await {
                    report(name, e, &outlet).await;
                    return;
                }
                debug!("Stage {} closed after {} chunk(s)", name, forwarded);
                return;
            }
        }
    }
}

/// Wait for `stage` to become ready; `false` if downstream closed first
async fn ready_or_closed<S: Stage>(stage: &mut S, outlet: &Outlet) -> bool {
    tokio::select! {
        _ = stage.ready() => true,
        _ = outlet.closed() => {
            debug!("Stage {} stopped while waiting: downstream closed", outlet.stage);
            false
        }
    }
}

async fn report(name: &'static str, error: StageError, outlet: &Outlet) {
    match error {
        // Downstream already holds the error that made it stop
        StageError::Closed(_) => debug!("Stage {} stopped: downstream closed", name),
        other => {
            warn!("Stage {} failed: {}", name, other);
            outlet.fail(PipelineError::new(name, other)).await;
        }
    }
}
