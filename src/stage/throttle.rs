//! Throttle stage - bounded-rate pass-through

use crate::stage::{Chunk, Outlet, Stage, StageError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Fixed delay between successive forwards
pub const THROTTLE_DELAY: Duration = Duration::from_millis(1000);

/// Forwards chunks unmodified, at most one per delay interval
///
/// Each chunk is forwarded as soon as it is accepted; the delay then runs
/// before the next chunk (or the close) is accepted. An upstream error does
/// not wait for the pending delay.
#[derive(Debug, Clone)]
pub struct ThrottleStage {
    delay: Duration,
    ready_at: Option<Instant>,
}

impl ThrottleStage {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ready_at: None,
        }
    }
}

impl Default for ThrottleStage {
    fn default() -> Self {
        Self::new(THROTTLE_DELAY)
    }
}

#[async_trait]
impl Stage for ThrottleStage {
    fn name(&self) -> &'static str {
        "throttle"
    }

    async fn ready(&mut self) {
        if let Some(ready_at) = self.ready_at.take() {
            tokio::time::sleep_until(ready_at).await;
        }
    }

    async fn process(&mut self, chunk: Chunk, out: &Outlet) -> Result<(), StageError> {
        out.send(chunk).await?;
        self.ready_at = Some(Instant::now() + self.delay);
        debug!("Throttle holding input for {:?}", self.delay);
        Ok(())
    }
}
