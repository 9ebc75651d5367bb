//! Test utility functions for relay

use relay::core::{ExecutionStatus, RelayConfig, RunState, StepKind, StepState};
use relay::execution::{ExecutionEngine, ExecutionEvent, RelayError};
use relay::fetch::{FetchError, Fetcher};
use relay::stage::ThrottleStage;

use async_trait::async_trait;
use bytes::Bytes;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Throttle delay used by scenario runs
pub const TEST_DELAY: Duration = Duration::from_millis(5);

/// Fetcher that returns a fixed payload
#[derive(Clone)]
pub struct StubFetcher {
    payload: Bytes,
    calls: Arc<AtomicUsize>,
}

impl StubFetcher {
    pub fn new(payload: &str) -> Self {
        Self {
            payload: Bytes::copy_from_slice(payload.as_bytes()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times `fetch` was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, _host: &str, _path: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Fetcher that always fails
pub struct FailingFetcher;

#[async_trait]
impl Fetcher for FailingFetcher {
    async fn fetch(&self, host: &str, _path: &str) -> Result<Bytes, FetchError> {
        Err(FetchError::Client(format!("connection to {} refused", host)))
    }
}

/// Result of running the engine in a scratch directory
pub struct RunOutcome {
    pub state: RunState,
    pub result: Result<(), RelayError>,
    pub events: Vec<ExecutionEvent>,
    pub config: RelayConfig,
    // Keeps the output directory alive for the test's assertions
    _dir: TempDir,
}

impl RunOutcome {
    pub fn xml_path(&self) -> PathBuf {
        self.config.xml_path()
    }

    pub fn json_path(&self) -> PathBuf {
        self.config.json_path()
    }

    pub fn archive_path(&self) -> PathBuf {
        self.config.archive_path()
    }

    /// Steps that emitted a `StepStarted` event, in order
    pub fn started_steps(&self) -> Vec<StepKind> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::StepStarted { step } => Some(*step),
                _ => None,
            })
            .collect()
    }
}

/// Run the engine with a stub fetcher returning `payload`
pub async fn run_with_payload(payload: &str) -> RunOutcome {
    run_with_fetcher(StubFetcher::new(payload), |_| {}).await
}

/// Run the engine with any fetcher; `prepare` may alter the output directory first
pub async fn run_with_fetcher<F, P>(fetcher: F, prepare: P) -> RunOutcome
where
    F: Fetcher,
    P: FnOnce(&Path),
{
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    prepare(dir.path());

    let config = RelayConfig::default().with_output_dir(dir.path());
    let mut engine = ExecutionEngine::new(fetcher, config.clone())
        .with_throttle(ThrottleStage::new(TEST_DELAY));

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));

    let mut state = RunState::new();
    let result = engine.execute(&mut state).await;
    let events = events.lock().unwrap().clone();

    RunOutcome {
        state,
        result,
        events,
        config,
        _dir: dir,
    }
}

/// Names of the entries in a ZIP archive, sorted
pub fn archive_entries(path: &Path) -> Vec<String> {
    let file = File::open(path)
        .unwrap_or_else(|e| panic!("Failed to open archive {}: {}", path.display(), e));
    let archive = zip::ZipArchive::new(file).expect("Archive should be readable");
    let mut names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    names.sort();
    names
}

/// Assert the run completed with every step completed
pub fn assert_run_completed(outcome: &RunOutcome) {
    assert!(
        outcome.result.is_ok(),
        "Run should have succeeded, got: {:?}",
        outcome.result
    );
    assert_eq!(outcome.state.status, ExecutionStatus::Completed);
    for step in StepKind::ALL {
        assert!(
            matches!(outcome.state.step(step), StepState::Completed { .. }),
            "Step '{}' should be completed, but was: {:?}",
            step,
            outcome.state.step(step)
        );
    }
}

/// Assert the run failed at `step` and every later step was skipped
pub fn assert_run_failed_at(outcome: &RunOutcome, step: StepKind) {
    assert!(outcome.result.is_err(), "Run should have failed");
    assert_eq!(outcome.state.status, ExecutionStatus::Failed);
    assert_eq!(
        outcome.state.failed_step(),
        Some(step),
        "Expected '{}' to fail, step states: {:?}",
        step,
        StepKind::ALL.map(|s| outcome.state.step(s).clone())
    );

    let later = StepKind::ALL.iter().skip_while(|s| **s != step).skip(1);
    for skipped in later {
        assert!(
            matches!(outcome.state.step(*skipped), StepState::Skipped { .. }),
            "Step '{}' should be skipped, but was: {:?}",
            skipped,
            outcome.state.step(*skipped)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_fetcher_counts_calls() {
        let fetcher = StubFetcher::new("[]");
        let body = fetcher.fetch("host", "/path").await.unwrap();
        assert_eq!(body, Bytes::from("[]"));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_fetcher_names_host() {
        let err = FailingFetcher.fetch("example.com", "/").await.unwrap_err();
        assert!(err.to_string().contains("example.com"));
    }
}
