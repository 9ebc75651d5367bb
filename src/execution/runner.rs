//! Transform pipeline runner - source → throttle → convert → sink

use crate::stage::{
    self, drive, Chunk, ConvertStage, PipelineError, Signal, StageError, ThrottleStage,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Terminal consumer of the pipeline
#[async_trait]
pub trait Sink: Send {
    /// Name used in logs and error reports
    fn name(&self) -> &'static str;

    /// Prepare the sink before any chunk arrives
    async fn open(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    /// Consume one chunk
    async fn write(&mut self, chunk: &Chunk) -> Result<(), StageError>;

    /// Flush everything; called once after the last chunk
    async fn close(&mut self) -> Result<(), StageError>;
}

/// Sink writing every chunk to a file
///
/// The file is created (or truncated) when the sink opens, so a failed run
/// can leave a partial file behind. It is only complete once `close` has
/// returned.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
    written: usize,
}

impl FileSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            file: None,
            written: 0,
        }
    }

}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> &'static str {
        "file-sink"
    }

    async fn open(&mut self) -> Result<(), StageError> {
        self.file = Some(File::create(&self.path).await?);
        Ok(())
    }

    async fn write(&mut self, chunk: &Chunk) -> Result<(), StageError> {
        let file = self.file.as_mut().ok_or(StageError::Closed("file-sink"))?;
        file.write_all(chunk).await?;
        self.written += chunk.len();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StageError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        debug!("Flushed {} bytes to {}", self.written, self.path.display());
        Ok(())
    }
}

/// The throttle and conversion stages, wired between a one-chunk source and
/// a sink
#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    throttle: ThrottleStage,
    convert: ConvertStage,
}

impl TransformPipeline {
    pub fn new(throttle: ThrottleStage) -> Self {
        Self {
            throttle,
            convert: ConvertStage::new(),
        }
    }

    /// Run `payload` through every stage into `sink`
    ///
    /// All stages advance on the calling task. The result is `Ok` only once
    /// the sink has flushed the converted document; otherwise it is the first
    /// error raised anywhere in the chain. Any error stops every stage.
    ///
    /// The sink is opened before any stage starts, so a sink that cannot open
    /// fails the run without waiting on the throttle.
    pub async fn run<K: Sink>(self, payload: Bytes, mut sink: K) -> Result<(), PipelineError> {
        info!("Running transform pipeline on {} bytes", payload.len());
        let name = sink.name();
        sink.open().await.map_err(|e| PipelineError::new(name, e))?;

        let (source_tx, source_rx) = stage::channel();
        let (throttle_tx, throttle_rx) = stage::channel();
        let (convert_tx, convert_rx) = stage::channel();

        let (_, _, _, result) = tokio::join!(
            feed(vec![payload], source_tx),
            drive(self.throttle, source_rx, throttle_tx),
            drive(self.convert, throttle_rx, convert_tx),
            drain(sink, convert_rx),
        );

        result
    }
}

/// Push `chunks` downstream, then close
async fn feed(chunks: Vec<Chunk>, tx: mpsc::Sender<Signal>) {
    for chunk in chunks {
        if tx.send(Ok(chunk)).await.is_err() {
            debug!("Source stopped: pipeline closed early");
            return;
        }
    }
}

/// Consume signals into an opened `sink` until close or error
async fn drain<K: Sink>(mut sink: K, mut rx: mpsc::Receiver<Signal>) -> Result<(), PipelineError> {
    let name = sink.name();
    let wrap = |e| PipelineError::new(name, e);

    loop {
        match rx.recv().await {
            Some(Ok(chunk)) => sink.write(&chunk).await.map_err(wrap)?,
            Some(Err(upstream)) => return Err(upstream),
            None => {
                sink.close().await.map_err(wrap)?;
                return Ok(());
            }
        }
    }
}
