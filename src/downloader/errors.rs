// Error types for the download pipeline

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// What went wrong on the extraction engine side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// Timeouts, resets, DNS failures and similar transport problems
    Network,
    /// The engine itself refused or failed (unsupported URL, missing format, ...)
    Extractor,
    /// yt-dlp (or its python runtime) is not installed
    ToolNotFound,
    /// The operation was cancelled before the engine finished
    Cancelled,
}

impl EngineErrorKind {
    /// Infer the kind from raw engine output.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("connection reset")
            || lower.contains("connection refused")
            || lower.contains("connection aborted")
            || lower.contains("network is unreachable")
            || lower.contains("failed to resolve")
            || lower.contains("name or service not known")
            || lower.contains("temporary failure in name resolution")
            || lower.contains("urlopen error")
        {
            return Self::Network;
        }

        if lower.contains("command not found") || lower.contains("no such file or directory") {
            return Self::ToolNotFound;
        }

        Self::Extractor
    }
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Extractor => write!(f, "extractor"),
            Self::ToolNotFound => write!(f, "tool-not-found"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Error returned across the extraction engine boundary.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(EngineErrorKind::Cancelled, "Download cancelled")
    }
}

// Convert raw stderr text, guessing the kind from its content
impl From<String> for EngineError {
    fn from(s: String) -> Self {
        Self {
            kind: EngineErrorKind::classify(&s),
            message: s,
        }
    }
}

/// Every way a single download operation can fail.
///
/// All variants collapse into a `Failed` terminal event at the orchestrator
/// boundary; the `Display` text is what the caller sees.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The request was rejected before any engine call
    #[error("{0}")]
    InvalidRequest(String),

    /// Bad, unreachable or unsupported source URL (engine text kept verbatim)
    #[error("{0}")]
    Resolution(String),

    /// Network or engine failure while transferring or post-processing
    #[error("{message}")]
    Transfer {
        kind: EngineErrorKind,
        message: String,
    },

    /// The staged artifact could not be found under any expected name
    #[error("Could not locate the produced artifact in {}", .directory.display())]
    Placement { directory: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Anything else, including a panic inside the operation task
    #[error("{0}")]
    Unexpected(String),
}

impl DownloadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Transfer {
                kind: EngineErrorKind::Cancelled,
                ..
            }
        )
    }

    /// Short human label used as the prefix of the failure log line.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "Invalid request",
            Self::Resolution(_) => "Could not resolve video",
            Self::Transfer {
                kind: EngineErrorKind::Network,
                ..
            } => "Network error",
            Self::Transfer {
                kind: EngineErrorKind::Cancelled,
                ..
            } => "Cancelled",
            Self::Transfer { .. } => "Download error",
            Self::Placement { .. } => "Placement error",
            Self::Io(_) => "File system error",
            Self::Unexpected(_) => "Error",
        }
    }
}
