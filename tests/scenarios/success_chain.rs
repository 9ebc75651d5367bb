//! Test: Success Chain - fetch, transform, persist and archive in order

use crate::helpers::*;
use relay::core::StepKind;
use relay::execution::ExecutionEvent;

/// End-to-end: one record with two fields
#[tokio::test]
async fn test_full_chain_produces_three_files() {
    let payload = r#"[{"id":1,"title":"a"}]"#;

    let outcome = run_with_payload(payload).await;

    assert_run_completed(&outcome);

    // XML file with one item and two fields
    let xml = std::fs::read_to_string(outcome.xml_path()).unwrap();
    assert_eq!(
        xml,
        "<root>\n<item>\n<id>1</id>\n<title>a</title>\n</item>\n</root>\n"
    );

    // JSON file byte-identical to the fetch result
    let json = std::fs::read(outcome.json_path()).unwrap();
    assert_eq!(json, payload.as_bytes());

    // Archive with exactly those two files by base name
    assert_eq!(
        archive_entries(&outcome.archive_path()),
        vec!["data.json", "data.xml"]
    );
}

/// Steps start in strict order and each completes before the next starts
#[tokio::test]
async fn test_steps_run_in_sequence() {
    let outcome = run_with_payload(r#"[{"id":1,"done":false}]"#).await;

    assert_run_completed(&outcome);
    assert_eq!(outcome.started_steps(), StepKind::ALL.to_vec());

    let mut open: Option<StepKind> = None;
    for event in &outcome.events {
        match event {
            ExecutionEvent::StepStarted { step } => {
                assert!(open.is_none(), "{} started while {:?} was running", step, open);
                open = Some(*step);
            }
            ExecutionEvent::StepCompleted { step } => {
                assert_eq!(open, Some(*step));
                open = None;
            }
            _ => {}
        }
    }
    assert!(open.is_none());
}

/// The fetcher is called exactly once per run
#[tokio::test]
async fn test_single_fetch_per_run() {
    let fetcher = StubFetcher::new("[]");
    let outcome = run_with_fetcher(fetcher.clone(), |_| {}).await;

    assert_run_completed(&outcome);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        std::fs::read_to_string(outcome.xml_path()).unwrap(),
        "<root>\n</root>\n"
    );
}

/// Key order and item count survive the whole chain
#[tokio::test]
async fn test_many_records_preserve_order() {
    let payload = r#"[
        {"userId":1,"id":1,"title":"delectus aut autem","completed":false},
        {"userId":1,"id":2,"title":"quis ut nam facilis","completed":false},
        {"userId":1,"id":3,"title":"fugiat veniam minus","completed":true}
    ]"#;

    let outcome = run_with_payload(payload).await;
    assert_run_completed(&outcome);

    let xml = std::fs::read_to_string(outcome.xml_path()).unwrap();
    assert_eq!(xml.matches("<item>").count(), 3);
    assert!(xml.contains(
        "<item>\n<userId>1</userId>\n<id>3</id>\n<title>fugiat veniam minus</title>\n<completed>true</completed>\n</item>\n"
    ));

    // JSON copy keeps the fetched whitespace verbatim
    assert_eq!(std::fs::read(outcome.json_path()).unwrap(), payload.as_bytes());
}
