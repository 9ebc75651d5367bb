//! Test: Failure Handling - the first error stops the chain

use crate::helpers::*;
use relay::core::StepKind;
use relay::execution::{ExecutionEvent, RelayError};
use relay::stage::StageError;

/// A failed fetch leaves no files behind
#[tokio::test]
async fn test_fetch_failure_stops_everything() {
    let outcome = run_with_fetcher(FailingFetcher, |_| {}).await;

    assert_run_failed_at(&outcome, StepKind::Fetch);
    assert!(matches!(outcome.result, Err(RelayError::Fetch(_))));
    assert!(!outcome.xml_path().exists());
    assert!(!outcome.json_path().exists());
    assert!(!outcome.archive_path().exists());
}

/// Malformed JSON fails in the conversion stage
#[tokio::test]
async fn test_conversion_failure() {
    let outcome = run_with_payload(r#"{"id":1}"#).await;

    assert_run_failed_at(&outcome, StepKind::Transform);
    match &outcome.result {
        Err(RelayError::Pipeline(e)) => {
            assert_eq!(e.stage, "convert");
            assert!(matches!(e.source, StageError::Conversion(_)));
        }
        other => panic!("Expected a pipeline error, got {:?}", other),
    }
    assert!(!outcome.json_path().exists());
    assert!(!outcome.archive_path().exists());
}

/// A sink that cannot be written reports its error; persist and archive never run
#[tokio::test]
async fn test_sink_failure_skips_persist_and_archive() {
    // A directory where the XML file should go makes the sink fail
    let outcome = run_with_fetcher(StubFetcher::new(r#"[{"id":1}]"#), |dir| {
        std::fs::create_dir(dir.join("data.xml")).unwrap();
    })
    .await;

    assert_run_failed_at(&outcome, StepKind::Transform);
    match &outcome.result {
        Err(RelayError::Pipeline(e)) => assert_eq!(e.stage, "file-sink"),
        other => panic!("Expected a sink error, got {:?}", other),
    }
    assert!(!outcome.json_path().exists());
    assert!(!outcome.archive_path().exists());

    let skipped: Vec<StepKind> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            ExecutionEvent::StepSkipped { step } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![StepKind::Persist, StepKind::Archive]);
}

/// A failed JSON write means no archive is created
#[tokio::test]
async fn test_persist_failure_skips_archive() {
    let outcome = run_with_fetcher(StubFetcher::new(r#"[{"id":1}]"#), |dir| {
        std::fs::create_dir(dir.join("data.json")).unwrap();
    })
    .await;

    assert_run_failed_at(&outcome, StepKind::Persist);
    assert!(matches!(outcome.result, Err(RelayError::Persist(_))));

    // The pipeline already finished, so the XML file is complete
    assert!(outcome.xml_path().is_file());
    assert!(!outcome.archive_path().exists());
}

/// The terminal event reports failure exactly once
#[tokio::test]
async fn test_single_terminal_event_on_failure() {
    let outcome = run_with_payload("not json").await;

    let terminal: Vec<&ExecutionEvent> = outcome
        .events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::RunCompleted { .. }))
        .collect();
    assert_eq!(terminal.len(), 1);
    assert!(matches!(
        terminal[0],
        ExecutionEvent::RunCompleted {
            status: relay::core::ExecutionStatus::Failed,
            ..
        }
    ));
}

/// An archive that cannot be created fails the last step only
#[tokio::test]
async fn test_archive_failure() {
    let outcome = run_with_fetcher(StubFetcher::new("[]"), |dir| {
        std::fs::create_dir(dir.join("compressed.zip")).unwrap();
    })
    .await;

    assert_run_failed_at(&outcome, StepKind::Archive);
    assert!(matches!(outcome.result, Err(RelayError::Persist(_))));
    assert!(outcome.xml_path().is_file());
    assert!(outcome.json_path().is_file());
}
