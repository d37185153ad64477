mod common;

use std::sync::Arc;

use common::*;
use yt_fetch_lib::downloader::{EngineError, EngineErrorKind, Event, ProgressSample};
use yt_fetch_lib::{DownloadRequest, Downloader, FormatType, Outcome, Quality};

fn request(dir: &std::path::Path) -> DownloadRequest {
    DownloadRequest::new("https://www.youtube.com/watch?v=abc123", dir)
}

#[tokio::test]
async fn existing_file_skips_without_transfer() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Test Video-high.mp4"), b"original").unwrap();
    let engine = Arc::new(ScriptedEngine::titled("Test Video").with_artifact(".mp4", b"new"));

    let (outcome, events) = run_collect(engine.clone(), request(dir.path())).await;

    assert_eq!(outcome, Outcome::Skipped);
    let (terminal, message) = assert_single_terminal_last(&events);
    assert_eq!(terminal, Outcome::Skipped);
    assert_eq!(message, "Download skipped - file exists");
    assert_eq!(engine.resolves(), 1);
    assert_eq!(engine.downloads(), 0);
    assert_eq!(std::fs::read(dir.path().join("Test Video-high.mp4")).unwrap(), b"original");
    assert!(log_lines(&events).contains(&"File already exists: Test Video-high.mp4".to_string()));
}

#[tokio::test]
async fn high_quality_video_lands_under_final_name() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(
        ScriptedEngine::titled("Test Video")
            .with_samples(vec![
                ProgressSample::downloading(0, Some(1000)),
                ProgressSample::downloading(500, Some(1000)),
                ProgressSample::finished(1000),
            ])
            .with_artifact(".mp4", b"video bytes"),
    );

    let (outcome, events) = run_collect(engine.clone(), request(dir.path()).with_quality(Quality::High)).await;

    assert_eq!(outcome, Outcome::Completed);
    let (_, message) = assert_single_terminal_last(&events);
    assert_eq!(message, "Download completed successfully!");
    assert_eq!(dir_entries(dir.path()), vec!["Test Video-high.mp4".to_string()]);
    assert_eq!(std::fs::read(dir.path().join("Test Video-high.mp4")).unwrap(), b"video bytes");

    let logs = log_lines(&events);
    assert!(logs.contains(&"Video title: Test Video".to_string()));
    assert!(logs.contains(&"Download completed, now processing...".to_string()));
    assert!(logs.contains(&"Saved as: Test Video-high.mp4".to_string()));
    assert_eq!(percents(&events), vec![0, 0, 50, 100]);
}

#[tokio::test]
async fn force_overwrite_replaces_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Test Video-high.mp4"), b"old").unwrap();
    let engine = Arc::new(ScriptedEngine::titled("Test Video").with_artifact(".mp4", b"new"));

    let (outcome, _) = run_collect(engine.clone(), request(dir.path()).with_force_overwrite(true)).await;

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(engine.downloads(), 1);
    assert_eq!(dir_entries(dir.path()), vec!["Test Video-high.mp4".to_string()]);
    assert_eq!(std::fs::read(dir.path().join("Test Video-high.mp4")).unwrap(), b"new");
}

#[tokio::test]
async fn unexpected_container_is_recovered_by_fallback_scan() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::titled("Clip").with_artifact(".webm", b"webm bytes"));

    let (outcome, events) = run_collect(engine, request(dir.path()).with_quality(Quality::Medium)).await;

    assert_eq!(outcome, Outcome::Completed);
    assert_single_terminal_last(&events);
    assert_eq!(dir_entries(dir.path()), vec!["Clip-medium.mp4".to_string()]);
    assert!(log_lines(&events).iter().any(|l| l.starts_with("Looking for downloaded file")));
}

#[tokio::test]
async fn audio_has_no_quality_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::titled("My Song: Live!").with_artifact(".mp3", b"mp3"));

    let (outcome, events) = run_collect(
        engine,
        request(dir.path()).with_format(FormatType::Audio).with_quality(Quality::Low),
    )
    .await;

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(dir_entries(dir.path()), vec!["My Song Live.mp3".to_string()]);
    assert!(log_lines(&events).iter().any(|l| l.starts_with("Note: For audio format")));
}

#[tokio::test]
async fn override_name_is_sanitized_and_suffixed() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::titled("Ignored Title").with_artifact(".mp4", b"v"));

    let (outcome, _) = run_collect(
        engine,
        request(dir.path())
            .with_base_name(Some("  my/clip  ".to_string()))
            .with_quality(Quality::Low),
    )
    .await;

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(dir_entries(dir.path()), vec!["myclip-low.mp4".to_string()]);
}

#[tokio::test]
async fn punctuation_only_title_uses_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::titled("?!*").with_artifact(".mp4", b"v"));

    let (outcome, _) = run_collect(engine, request(dir.path())).await;

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(dir_entries(dir.path()), vec!["Unknown-high.mp4".to_string()]);
}

#[tokio::test]
async fn resolution_failure_keeps_engine_text() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::unresolvable(EngineError::new(
        EngineErrorKind::Extractor,
        "ERROR: Unsupported URL: https://example.com",
    )));

    let (outcome, events) = run_collect(engine.clone(), request(dir.path())).await;

    assert_eq!(outcome, Outcome::Failed);
    let (_, message) = assert_single_terminal_last(&events);
    assert_eq!(message, "ERROR: Unsupported URL: https://example.com");
    assert_eq!(engine.downloads(), 0);
    assert!(!log_lines(&events).is_empty());
}

#[tokio::test]
async fn network_failure_is_logged_and_leftovers_removed() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(
        ScriptedEngine::titled("Test Video")
            .with_artifact(".f137.mp4.part", b"partial")
            .failing_with(EngineError::new(EngineErrorKind::Network, "The read operation timed out")),
    );

    let (outcome, events) = run_collect(engine, request(dir.path())).await;

    assert_eq!(outcome, Outcome::Failed);
    let (_, message) = assert_single_terminal_last(&events);
    assert_eq!(message, "The read operation timed out");
    assert!(log_lines(&events).contains(&"Network error: The read operation timed out".to_string()));
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn engine_download_error_is_distinguished_in_logs() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(
        ScriptedEngine::titled("Test Video")
            .failing_with(EngineError::new(EngineErrorKind::Extractor, "Requested format is not available")),
    );

    let (outcome, events) = run_collect(engine, request(dir.path())).await;

    assert_eq!(outcome, Outcome::Failed);
    assert!(log_lines(&events).contains(&"Download error: Requested format is not available".to_string()));
}

#[tokio::test]
async fn missing_artifact_fails_and_points_at_directory() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::titled("Test Video").with_artifact(".txt", b"not media"));

    let (outcome, events) = run_collect(engine, request(dir.path())).await;

    assert_eq!(outcome, Outcome::Failed);
    assert_single_terminal_last(&events);
    let shown = dir.path().display().to_string();
    assert!(log_lines(&events).iter().any(|l| l.contains(&shown)));
    // Left in place for manual inspection
    assert_eq!(dir_entries(dir.path()).len(), 1);
}

#[tokio::test]
async fn engine_panic_still_yields_one_failed_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::titled("Test Video").panicking());

    let (outcome, events) = run_collect(engine, request(dir.path())).await;

    assert_eq!(outcome, Outcome::Failed);
    let (terminal, message) = assert_single_terminal_last(&events);
    assert_eq!(terminal, Outcome::Failed);
    assert!(message.contains("engine exploded"));
}

#[tokio::test]
async fn inconsistent_counters_stay_in_range() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(
        ScriptedEngine::titled("Test Video")
            .with_samples(vec![
                ProgressSample::downloading(900, Some(100)),
                ProgressSample::downloading(10, None),
                ProgressSample::downloading(50, Some(1000)),
                ProgressSample {
                    total_bytes_estimate: Some(-5.0),
                    ..ProgressSample::downloading(5, None)
                },
            ])
            .with_artifact(".mp4", b"v"),
    );

    let (outcome, events) = run_collect(engine, request(dir.path())).await;

    assert_eq!(outcome, Outcome::Completed);
    let values = percents(&events);
    assert_eq!(values, vec![0, 100, 5]);
    assert!(values.iter().all(|p| *p <= 100));
}

#[tokio::test]
async fn invalid_requests_fail_before_engine_calls() {
    let dir = tempfile::tempdir().unwrap();

    let engine = Arc::new(ScriptedEngine::titled("Test Video"));
    let (outcome, events) = run_collect(engine.clone(), DownloadRequest::new("   ", dir.path())).await;
    assert_eq!(outcome, Outcome::Failed);
    let (_, message) = assert_single_terminal_last(&events);
    assert_eq!(message, "Please enter a video URL");
    assert_eq!(engine.resolves(), 0);

    let missing = dir.path().join("does-not-exist");
    let (outcome, _) = run_collect(engine.clone(), request(&missing)).await;
    assert_eq!(outcome, Outcome::Failed);
    assert_eq!(engine.resolves(), 0);
    assert!(!missing.exists());
}

#[tokio::test]
async fn started_operation_can_be_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::titled("Test Video").waiting_for_cancel());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = Downloader::new(engine).start(request(dir.path()), Arc::new(tx));
    handle.cancel();
    let outcome = handle.join().await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(outcome, Outcome::Failed);
    let (_, message) = assert_single_terminal_last(&events);
    assert_eq!(message, "Download cancelled");
}

#[tokio::test]
async fn concurrent_operations_in_one_directory_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let first = Arc::new(ScriptedEngine::titled("First").with_artifact(".mp4", b"1"));
    let second = Arc::new(ScriptedEngine::titled("Second").with_artifact(".mp4", b"2"));

    let (a, b) = tokio::join!(
        run_collect(first.clone(), request(dir.path())),
        run_collect(second.clone(), request(dir.path())),
    );

    assert_eq!(a.0, Outcome::Completed);
    assert_eq!(b.0, Outcome::Completed);
    assert_eq!(
        dir_entries(dir.path()),
        vec!["First-high.mp4".to_string(), "Second-high.mp4".to_string()]
    );
    assert_ne!(first.templates.lock().unwrap()[0], second.templates.lock().unwrap()[0]);
    assert_eq!(std::fs::read(dir.path().join("Second-high.mp4")).unwrap(), b"2");
}

#[tokio::test]
async fn events_serialize_as_tagged_json() {
    let json = serde_json::to_string(&Event::Progress { percent: 42 }).unwrap();
    assert_eq!(json, r#"{"type":"Progress","data":{"percent":42}}"#);
}

#[tokio::test]
async fn closure_sink_sees_events_in_order() {
    use std::sync::Mutex;
    use yt_fetch_lib::downloader::CallbackSink;

    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(
        ScriptedEngine::titled("Ordered")
            .with_samples(vec![ProgressSample::downloading(40, Some(100))])
            .with_artifact(".mp4", b"bytes"),
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    let collector = seen.clone();
    let sink = CallbackSink(move |event: Event| collector.lock().unwrap().push(event));

    let outcome = Downloader::new(engine).run(request(dir.path()), Arc::new(sink)).await;

    assert_eq!(outcome, Outcome::Completed);
    let events = seen.lock().unwrap().clone();
    assert_single_terminal_last(&events);
    assert_eq!(percents(&events), vec![0, 40]);

    let logs = log_lines(&events);
    let title = logs.iter().position(|l| l == "Video title: Ordered").unwrap();
    let saved = logs.iter().position(|l| l == "Saved as: Ordered-high.mp4").unwrap();
    assert!(title < saved);
}
