pub mod downloader;

use std::sync::Arc;

pub use downloader::{
    DownloadError, DownloadHandle, DownloadRequest, Downloader, EngineConfig, Event, EventSink, FormatType,
    Outcome, Quality,
};

use downloader::YtDlpEngine;

/// Orchestrator backed by yt-dlp, configured from the environment
pub fn default_downloader() -> Downloader {
    let config = EngineConfig::from_env();
    let selector = downloader::FormatSelector::new(config.audio_quality_kbps);
    Downloader::new(Arc::new(YtDlpEngine::new(config))).with_format_selector(selector)
}

/// Start one download on a background task; events flow into `sink`.
///
/// Returns immediately. Must be called from within a tokio runtime.
pub fn start_download(request: DownloadRequest, sink: Arc<dyn EventSink>) -> DownloadHandle {
    default_downloader().start(request, sink)
}

/// Run one download to completion on the current task.
pub async fn run_download(request: DownloadRequest, sink: Arc<dyn EventSink>) -> Outcome {
    default_downloader().run(request, sink).await
}
