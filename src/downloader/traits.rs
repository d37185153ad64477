// Extraction engine boundary and event delivery

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use super::errors::EngineError;
use super::models::{Event, Outcome, ProgressSample, TransferSpec, VideoMetadata};

/// Progress callback invoked synchronously by the engine during a transfer
pub type ProgressCallback<'a> = &'a (dyn Fn(ProgressSample) + Send + Sync);

/// External extraction/download engine (yt-dlp in production)
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Resolve metadata without transferring any media bytes
    async fn resolve_metadata(&self, url: &str) -> Result<VideoMetadata, EngineError>;

    /// Download into `output_template` (contains a `%(ext)s` placeholder).
    ///
    /// Engines that cannot stop mid-transfer may ignore `cancel`.
    async fn download(
        &self,
        url: &str,
        spec: &TransferSpec,
        output_template: &Path,
        progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError>;
}

/// Consumer of the event stream. Delivery is fire-and-forget.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

impl EventSink for UnboundedSender<Event> {
    fn emit(&self, event: Event) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.send(event);
    }
}

/// Adapts a plain closure into an [`EventSink`]
pub struct CallbackSink<F>(pub F);

impl<F> EventSink for CallbackSink<F>
where
    F: Fn(Event) + Send + Sync,
{
    fn emit(&self, event: Event) {
        (self.0)(event)
    }
}

/// Progress emitter helper shared by the pipeline stages
#[derive(Clone)]
pub struct ProgressEmitter {
    sink: Arc<dyn EventSink>,
}

impl ProgressEmitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn progress(&self, percent: u8) {
        self.sink.emit(Event::Progress {
            percent: percent.min(100),
        });
    }

    pub fn log(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(target: "yt_fetch::events", "{}", text);
        self.sink.emit(Event::LogLine { text });
    }

    /// Only the orchestrator's outer task calls this, exactly once per run.
    pub(crate) fn terminal(&self, outcome: Outcome, message: impl Into<String>) {
        self.sink.emit(Event::Terminal {
            outcome,
            message: message.into(),
        });
    }
}
