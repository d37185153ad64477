// Downloader module - resolve, stage, place

pub mod backends;
pub mod config;
pub mod errors;
pub mod format_selector;
pub mod models;
pub mod naming;
pub mod orchestrator;
pub mod placement;
pub mod resolver;
pub mod traits;
pub mod transfer;
pub mod utils;

pub use backends::YtDlpEngine;
pub use config::EngineConfig;
pub use errors::{DownloadError, EngineError, EngineErrorKind};
pub use format_selector::FormatSelector;
pub use models::{
    DownloadRequest, Event, FormatType, Outcome, PostProcess, ProgressSample, ProgressStatus, Quality,
    StagingTicket, TransferSpec, VideoMetadata,
};
pub use orchestrator::{DownloadHandle, DownloadState, Downloader};
pub use traits::{CallbackSink, EventSink, ExtractionEngine, ProgressCallback, ProgressEmitter};
