// Scripted extraction engine and event helpers shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use yt_fetch_lib::downloader::{
    EngineError, Event, ExtractionEngine, Outcome, ProgressCallback, ProgressSample, TransferSpec, VideoMetadata,
};
use yt_fetch_lib::{DownloadRequest, Downloader};

/// Fake engine replaying a fixed script
pub struct ScriptedEngine {
    metadata: Result<VideoMetadata, EngineError>,
    samples: Vec<ProgressSample>,
    /// (suffix appended to the staging stem, contents), e.g. (".mp4", b"...")
    artifacts: Vec<(String, Vec<u8>)>,
    download_error: Option<EngineError>,
    panic_on_download: bool,
    wait_for_cancel: bool,
    pub resolve_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub templates: Mutex<Vec<PathBuf>>,
}

impl ScriptedEngine {
    pub fn titled(title: &str) -> Self {
        Self {
            metadata: Ok(VideoMetadata {
                id: "abc123".to_string(),
                title: title.to_string(),
                uploader: None,
                duration_seconds: Some(60),
            }),
            samples: Vec::new(),
            artifacts: Vec::new(),
            download_error: None,
            panic_on_download: false,
            wait_for_cancel: false,
            resolve_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            templates: Mutex::new(Vec::new()),
        }
    }

    pub fn unresolvable(error: EngineError) -> Self {
        Self {
            metadata: Err(error),
            ..Self::titled("")
        }
    }

    pub fn with_samples(mut self, samples: Vec<ProgressSample>) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_artifact(mut self, suffix: &str, contents: &[u8]) -> Self {
        self.artifacts.push((suffix.to_string(), contents.to_vec()));
        self
    }

    pub fn failing_with(mut self, error: EngineError) -> Self {
        self.download_error = Some(error);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_download = true;
        self
    }

    pub fn waiting_for_cancel(mut self) -> Self {
        self.wait_for_cancel = true;
        self
    }

    pub fn resolves(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

fn staging_stem(template: &Path) -> String {
    let template = template.to_string_lossy();
    template
        .strip_suffix(".%(ext)s")
        .unwrap_or(&template)
        .to_string()
}

#[async_trait]
impl ExtractionEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn resolve_metadata(&self, _url: &str) -> Result<VideoMetadata, EngineError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata.clone()
    }

    async fn download(
        &self,
        _url: &str,
        _spec: &TransferSpec,
        output_template: &Path,
        progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.templates.lock().unwrap().push(output_template.to_path_buf());

        if self.panic_on_download {
            panic!("engine exploded");
        }

        let stem = staging_stem(output_template);
        for (suffix, contents) in &self.artifacts {
            std::fs::write(format!("{}{}", stem, suffix), contents).unwrap();
        }

        for sample in &self.samples {
            progress(sample.clone());
        }

        if self.wait_for_cancel {
            cancel.cancelled().await;
            return Err(EngineError::cancelled());
        }

        match &self.download_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// Run one request to completion and collect every event
pub async fn run_collect(engine: Arc<ScriptedEngine>, request: DownloadRequest) -> (Outcome, Vec<Event>) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let outcome = Downloader::new(engine).run(request, Arc::new(tx)).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (outcome, events)
}

pub fn log_lines(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::LogLine { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

pub fn percents(events: &[Event]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect()
}

/// Exactly one Terminal event and it is the last one
pub fn assert_single_terminal_last(events: &[Event]) -> (Outcome, String) {
    let terminals: Vec<&Event> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminals.len(), 1, "expected one terminal event, got {:?}", events);
    match events.last() {
        Some(Event::Terminal { outcome, message }) => (*outcome, message.clone()),
        other => panic!("last event is not terminal: {:?}", other),
    }
}

pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
