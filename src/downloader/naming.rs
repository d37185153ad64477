// Naming policy - turns titles and overrides into final file names

use regex::Regex;

use super::models::{FormatType, Quality};

/// Base name used when nothing usable survives sanitizing
pub const FALLBACK_BASE_NAME: &str = "Unknown";

const ALLOWED_PUNCTUATION: &str = " _-()[]{}.,";

lazy_static::lazy_static! {
    static ref WS_RE: Regex = Regex::new(r"\s+").expect("valid whitespace regex");
}

/// Keep alphanumerics, spaces and `_-()[]{}.,`; collapse whitespace; trim.
pub fn sanitize(raw_title: &str) -> String {
    let kept: String = raw_title
        .chars()
        .filter(|c| c.is_alphanumeric() || ALLOWED_PUNCTUATION.contains(*c))
        .collect();

    WS_RE.replace_all(kept.trim(), " ").into_owned()
}

/// `""` for audio, `-low` / `-medium` / `-high` for video.
pub fn quality_suffix(format_type: FormatType, quality: Quality) -> &'static str {
    match format_type {
        FormatType::Audio => "",
        FormatType::Video => match quality {
            Quality::Low => "-low",
            Quality::Medium => "-medium",
            Quality::High => "-high",
        },
    }
}

/// `base` must already be sanitized.
pub fn final_file_name(base: &str, suffix: &str, ext: &str) -> String {
    format!("{}{}.{}", base, suffix, ext)
}

/// Pick the base name: sanitized override if given, else sanitized title,
/// else [`FALLBACK_BASE_NAME`].
pub fn resolve_base_name(override_name: Option<&str>, title: &str) -> String {
    let base = match override_name {
        Some(name) => sanitize(name),
        None => sanitize(title),
    };

    if base.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        base
    }
}
