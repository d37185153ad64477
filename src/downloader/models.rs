// Common data models for the download pipeline

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Quality tier requested by the user (only meaningful for video)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Low,
    Medium,
    High,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("Unknown quality '{}' (expected low, medium or high)", other)),
        }
    }
}

/// Whether the user wants the video or only its audio track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatType {
    Video,
    Audio,
}

impl FormatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(format!("Unknown format '{}' (expected video or audio)", other)),
        }
    }
}

/// One download request, immutable for the duration of the operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Opaque locator handed to the extraction engine
    pub source_url: String,
    /// Must already exist; never created by the pipeline
    pub destination_directory: PathBuf,
    /// User override for the base name; empty or `None` means "use the title"
    pub desired_base_name: Option<String>,
    pub quality: Quality,
    pub format_type: FormatType,
    /// Replace an existing final file instead of skipping
    pub force_overwrite: bool,
}

impl DownloadRequest {
    pub fn new(source_url: impl Into<String>, destination_directory: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination_directory: destination_directory.into(),
            desired_base_name: None,
            quality: Quality::High,
            format_type: FormatType::Video,
            force_overwrite: false,
        }
    }

    pub fn with_base_name(mut self, name: Option<String>) -> Self {
        self.desired_base_name = name;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_format(mut self, format_type: FormatType) -> Self {
        self.format_type = format_type;
        self
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    /// The override, if it contains anything besides whitespace
    pub fn base_name_override(&self) -> Option<&str> {
        self.desired_base_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Post-processing step applied by the engine after the bytes arrive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcess {
    /// Extract the audio track and re-encode it
    ExtractAudio {
        /// Target codec, e.g. "mp3"
        codec: &'static str,
        /// Target bitrate in kbps
        quality_kbps: u32,
    },
}

/// Concrete transfer parameters derived from the format/quality policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    /// yt-dlp stream selection expression
    pub format_selector: String,
    /// Container to merge separate video+audio streams into
    pub merge_container: Option<&'static str>,
    pub post_process: Option<PostProcess>,
    /// Extension of the final artifact (without the dot)
    pub extension: &'static str,
}

/// Video metadata resolved without downloading
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub uploader: Option<String>,
    pub duration_seconds: Option<u64>,
}

/// Transfer phase reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Downloading,
    /// All bytes received, post-processing about to start
    Finished,
}

/// One progress callback invocation from the engine
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSample {
    pub status: ProgressStatus,
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub total_bytes_estimate: Option<f64>,
    /// Human readable speed, e.g. "1.20MiB/s"
    pub speed_summary: Option<String>,
    /// Human readable ETA, e.g. "00:42"
    pub eta_summary: Option<String>,
}

impl ProgressSample {
    pub fn downloading(downloaded_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            status: ProgressStatus::Downloading,
            downloaded_bytes,
            total_bytes,
            total_bytes_estimate: None,
            speed_summary: None,
            eta_summary: None,
        }
    }

    pub fn finished(downloaded_bytes: u64) -> Self {
        Self {
            status: ProgressStatus::Finished,
            downloaded_bytes,
            total_bytes: Some(downloaded_bytes),
            total_bytes_estimate: None,
            speed_summary: None,
            eta_summary: None,
        }
    }
}

/// Per-operation token namespacing staging artifacts.
///
/// Generated locally from a random UUID; nothing tracks issued tickets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StagingTicket(String);

impl StagingTicket {
    pub const PREFIX: &'static str = "temp_";

    pub fn generate() -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}{}", Self::PREFIX, &id[..8]))
    }

    /// Build a ticket from a known id (tests, diagnostics)
    pub fn from_id(id: &str) -> Self {
        Self(format!("{}{}", Self::PREFIX, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Output template handed to the engine: `{dir}/{ticket}.%(ext)s`
    pub fn output_template(&self, directory: &Path) -> PathBuf {
        directory.join(format!("{}.%(ext)s", self.0))
    }

    /// Where the artifact lands when the engine honours the extension
    pub fn expected_artifact(&self, directory: &Path, ext: &str) -> PathBuf {
        directory.join(format!("{}.{}", self.0, ext))
    }

    /// Whether a directory entry name belongs to this operation
    pub fn owns(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.0.as_str())
            .map_or(false, |rest| rest.is_empty() || rest.starts_with('.'))
    }
}

impl fmt::Display for StagingTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal outcome of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Completed,
    Skipped,
    Failed,
}

/// Event delivered to the caller, in order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    Progress { percent: u8 },
    LogLine { text: String },
    Terminal { outcome: Outcome, message: String },
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }
}
