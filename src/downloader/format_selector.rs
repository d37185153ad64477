// FormatSelector - maps the (format, quality) policy onto yt-dlp parameters
//
// Video tiers:
// - Low:    worst mp4 video + worst m4a audio, falling back to the worst muxed file
// - Medium: best video up to 480p + best m4a audio
// - High:   best mp4 video + best m4a audio
// Audio ignores the quality tier and always extracts the best audio to mp3.

use super::models::{FormatType, PostProcess, Quality, TransferSpec};

pub const VIDEO_EXT: &str = "mp4";
pub const AUDIO_EXT: &str = "mp3";
pub const DEFAULT_AUDIO_KBPS: u32 = 192;

/// Containers yt-dlp may leave behind instead of the requested extension,
/// in the order they should be tried.
pub const CONTAINER_FALLBACKS: &[&str] = &["webm", "mkv", "m4a", "opus"];

/// Transfer spec builder
#[derive(Debug, Clone, Copy)]
pub struct FormatSelector {
    audio_quality_kbps: u32,
}

impl Default for FormatSelector {
    fn default() -> Self {
        Self {
            audio_quality_kbps: DEFAULT_AUDIO_KBPS,
        }
    }
}

impl FormatSelector {
    pub fn new(audio_quality_kbps: u32) -> Self {
        Self { audio_quality_kbps }
    }

    /// Build the transfer spec. Quality is accepted but ignored for audio.
    pub fn transfer_spec(&self, format_type: FormatType, quality: Quality) -> TransferSpec {
        match format_type {
            FormatType::Video => TransferSpec {
                format_selector: Self::video_selector(quality).to_string(),
                merge_container: Some(VIDEO_EXT),
                post_process: None,
                extension: VIDEO_EXT,
            },
            FormatType::Audio => TransferSpec {
                format_selector: "bestaudio/best".to_string(),
                merge_container: None,
                post_process: Some(PostProcess::ExtractAudio {
                    codec: AUDIO_EXT,
                    quality_kbps: self.audio_quality_kbps,
                }),
                extension: AUDIO_EXT,
            },
        }
    }

    /// yt-dlp stream selection expression for a video quality tier
    pub fn video_selector(quality: Quality) -> &'static str {
        match quality {
            Quality::Low => "worstvideo[ext=mp4]+worstaudio[ext=m4a]/worst[ext=mp4]/worst",
            Quality::Medium => {
                "bestvideo[height<=480][ext=mp4]+bestaudio[ext=m4a]/best[height<=480][ext=mp4]/best[height<=480]"
            }
            Quality::High => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
        }
    }

    /// Extension of the final artifact
    pub fn extension_for(format_type: FormatType) -> &'static str {
        match format_type {
            FormatType::Video => VIDEO_EXT,
            FormatType::Audio => AUDIO_EXT,
        }
    }
}
