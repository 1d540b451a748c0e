use std::time::{Duration, Instant};

use tempfile::TempDir;
use timeline_engine::{
    AbortReason, EngineEvent, EngineHandle, FetchRequest, FetchStage, FetcherConfig, Platform,
};

/// Drains events until a completion arrives or the deadline passes.
fn wait_for_completion(handle: &EngineHandle, deadline: Duration) -> Vec<EngineEvent> {
    let start = Instant::now();
    let mut events = Vec::new();
    loop {
        while let Some(event) = handle.try_recv() {
            let done = matches!(event, EngineEvent::FetchCompleted { .. });
            events.push(event);
            if done {
                return events;
            }
        }
        if start.elapsed() > deadline {
            return events;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn enqueued_fetch_reports_progress_and_completion() {
    let dir = TempDir::new().unwrap();
    let mut config = FetcherConfig::default();
    config.cookie_dir = dir.path().to_path_buf();
    let handle = EngineHandle::new(config);

    // No cookie file exists, so the fetch aborts before any browser work.
    handle.enqueue(7, FetchRequest::new(Platform::Twitter, "nasa", 5));
    let events = wait_for_completion(&handle, Duration::from_secs(10));

    let saw_loading = events.iter().any(|event| {
        matches!(
            event,
            EngineEvent::Progress(progress) if progress.stage == FetchStage::LoadingCookies
        )
    });
    assert!(saw_loading, "expected a LoadingCookies progress event");

    match events.last() {
        Some(EngineEvent::FetchCompleted { fetch_id, result }) => {
            assert_eq!(*fetch_id, 7);
            let report = result.as_ref().expect("soft failure");
            assert!(matches!(
                report.reason,
                Some(AbortReason::MissingCredentials { .. })
            ));
        }
        other => panic!("expected FetchCompleted, got {other:?}"),
    }
}
