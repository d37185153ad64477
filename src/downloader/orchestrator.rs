// Orchestrator - sequences one download operation and owns the event stream
//
// Idle -> ResolvingMetadata -> CheckingExistence -> Skipped
//                                                -> BuildingSpec -> Transferring -> Placing -> Completed
// Any step may end in Failed. Exactly one Terminal event is emitted per run,
// by the outer task, even if the inner one panics.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::errors::{DownloadError, EngineError};
use super::format_selector::FormatSelector;
use super::models::{DownloadRequest, FormatType, Outcome, StagingTicket};
use super::naming::{final_file_name, quality_suffix, resolve_base_name};
use super::traits::{EventSink, ExtractionEngine, ProgressEmitter};
use super::{placement, resolver, transfer};

pub const COMPLETED_MESSAGE: &str = "Download completed successfully!";
pub const SKIPPED_MESSAGE: &str = "Download skipped - file exists";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Idle,
    ResolvingMetadata,
    CheckingExistence,
    BuildingSpec,
    Transferring,
    Placing,
    Completed,
    Skipped,
    Failed,
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ResolvingMetadata => "resolving-metadata",
            Self::CheckingExistence => "checking-existence",
            Self::BuildingSpec => "building-spec",
            Self::Transferring => "transferring",
            Self::Placing => "placing",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Successful end of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
enum Completion {
    Completed(PathBuf),
    Skipped(PathBuf),
}

/// Handle to a running operation
pub struct DownloadHandle {
    cancel: CancellationToken,
    task: JoinHandle<Outcome>,
}

impl DownloadHandle {
    /// Request cancellation. The engine may still finish its current transfer.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal outcome
    pub async fn join(self) -> Outcome {
        self.task.await.unwrap_or(Outcome::Failed)
    }
}

/// Download orchestrator
#[derive(Clone)]
pub struct Downloader {
    engine: Arc<dyn ExtractionEngine>,
    selector: FormatSelector,
}

impl Downloader {
    pub fn new(engine: Arc<dyn ExtractionEngine>) -> Self {
        Self {
            engine,
            selector: FormatSelector::default(),
        }
    }

    pub fn with_format_selector(mut self, selector: FormatSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Start one operation on its own task and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, request: DownloadRequest, sink: Arc<dyn EventSink>) -> DownloadHandle {
        let cancel = CancellationToken::new();
        let this = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { this.run_with_cancel(request, sink, token).await });
        DownloadHandle { cancel, task }
    }

    /// Run one operation to completion on the current task.
    pub async fn run(&self, request: DownloadRequest, sink: Arc<dyn EventSink>) -> Outcome {
        self.run_with_cancel(request, sink, CancellationToken::new()).await
    }

    async fn run_with_cancel(
        &self,
        request: DownloadRequest,
        sink: Arc<dyn EventSink>,
        cancel: CancellationToken,
    ) -> Outcome {
        let emitter = ProgressEmitter::new(sink);
        let ticket = StagingTicket::generate();
        let span = tracing::info_span!("download", ticket = %ticket, url = %request.source_url);

        let operation = Operation {
            engine: Arc::clone(&self.engine),
            selector: self.selector,
            request,
            ticket,
            emitter: emitter.clone(),
            cancel,
            state: DownloadState::Idle,
        };

        let inner = tokio::spawn(operation.execute().instrument(span.clone()));
        let result = match inner.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(DownloadError::Unexpected(panic_message(e.into_panic()))),
            Err(e) => Err(DownloadError::Unexpected(e.to_string())),
        };

        span.in_scope(|| match result {
            Ok(Completion::Completed(path)) => {
                tracing::info!(path = %path.display(), "download completed");
                emitter.terminal(Outcome::Completed, COMPLETED_MESSAGE);
                Outcome::Completed
            }
            Ok(Completion::Skipped(path)) => {
                tracing::info!(path = %path.display(), "download skipped");
                emitter.terminal(Outcome::Skipped, SKIPPED_MESSAGE);
                Outcome::Skipped
            }
            Err(e) => {
                if e.is_cancelled() {
                    tracing::warn!("download cancelled");
                } else {
                    tracing::error!(error = %e, "download failed");
                }
                emitter.log(format!("{}: {}", e.label(), e));
                emitter.terminal(Outcome::Failed, e.to_string());
                Outcome::Failed
            }
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("Unexpected error: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("Unexpected error: {}", s)
    } else {
        "Unexpected error".to_string()
    }
}

/// State of one in-flight operation
struct Operation {
    engine: Arc<dyn ExtractionEngine>,
    selector: FormatSelector,
    request: DownloadRequest,
    ticket: StagingTicket,
    emitter: ProgressEmitter,
    cancel: CancellationToken,
    state: DownloadState,
}

impl Operation {
    fn advance(&mut self, next: DownloadState) {
        tracing::debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    fn ensure_not_cancelled(&self) -> Result<(), DownloadError> {
        if self.cancel.is_cancelled() {
            let e = EngineError::cancelled();
            return Err(DownloadError::Transfer {
                kind: e.kind,
                message: e.message,
            });
        }
        Ok(())
    }

    async fn validate(&self) -> Result<(), DownloadError> {
        if self.request.source_url.trim().is_empty() {
            return Err(DownloadError::InvalidRequest("Please enter a video URL".to_string()));
        }

        let dir = &self.request.destination_directory;
        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(DownloadError::InvalidRequest(format!(
                "Destination is not a directory: {}",
                dir.display()
            ))),
            Err(_) => Err(DownloadError::InvalidRequest(format!(
                "Destination directory does not exist: {}",
                dir.display()
            ))),
        }
    }

    async fn execute(mut self) -> Result<Completion, DownloadError> {
        let result = self.drive().await;
        let end = match &result {
            Ok(Completion::Completed(_)) => DownloadState::Completed,
            Ok(Completion::Skipped(_)) => DownloadState::Skipped,
            Err(_) => DownloadState::Failed,
        };
        self.advance(end);
        result
    }

    async fn drive(&mut self) -> Result<Completion, DownloadError> {
        self.validate().await?;
        let url = self.request.source_url.trim().to_string();
        let directory = self.request.destination_directory.clone();

        self.ensure_not_cancelled()?;
        self.advance(DownloadState::ResolvingMetadata);
        let metadata = resolver::resolve(self.engine.as_ref(), &url).await?;

        self.advance(DownloadState::CheckingExistence);
        let ext = FormatSelector::extension_for(self.request.format_type);
        let base = resolve_base_name(self.request.base_name_override(), &metadata.title);
        let suffix = quality_suffix(self.request.format_type, self.request.quality);
        let final_name = final_file_name(&base, suffix, ext);
        let final_path = directory.join(&final_name);

        if tokio::fs::try_exists(&final_path).await.unwrap_or(false) && !self.request.force_overwrite {
            self.emitter.log(format!("File already exists: {}", final_name));
            self.emitter.log("Use force overwrite to download it again.");
            return Ok(Completion::Skipped(final_path));
        }

        self.emitter.log(format!("Starting download: {}", url));
        self.emitter.log(format!("Video title: {}", metadata.title));
        if self.request.format_type == FormatType::Audio {
            self.emitter
                .log("Note: For audio format, quality selection is not applicable (always best quality)");
        }

        self.ensure_not_cancelled()?;
        self.advance(DownloadState::BuildingSpec);
        let spec = self
            .selector
            .transfer_spec(self.request.format_type, self.request.quality);
        self.emitter.log(format!(
            "Download options: format={}, quality={}",
            self.request.format_type, self.request.quality
        ));

        self.advance(DownloadState::Transferring);
        self.emitter.progress(0);
        let template = self.ticket.output_template(&directory);
        let transferred = transfer::execute(
            self.engine.as_ref(),
            &url,
            &template,
            &spec,
            &self.emitter,
            &self.cancel,
        )
        .await;

        if let Err(e) = transferred {
            placement::sweep_staging(&directory, &self.ticket).await;
            return Err(e);
        }

        self.advance(DownloadState::Placing);
        placement::place(
            &directory,
            &self.ticket,
            spec.extension,
            &final_path,
            self.request.force_overwrite,
            &self.emitter,
        )
        .await?;

        self.emitter.log(format!("Saved as: {}", final_name));
        placement::sweep_staging(&directory, &self.ticket).await;

        Ok(Completion::Completed(final_path))
    }
}
