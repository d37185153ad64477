// Engine configuration

use std::path::PathBuf;

use serde::Deserialize;

use super::format_selector::DEFAULT_AUDIO_KBPS;

/// Configuration for the yt-dlp engine adapter
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit yt-dlp binary; discovered on PATH / common locations when unset
    pub ytdlp_path: Option<PathBuf>,
    /// SOCKS5/HTTP proxy URL passed to yt-dlp
    pub proxy: Option<String>,
    /// yt-dlp `--socket-timeout` in seconds
    pub socket_timeout_secs: u32,
    /// Hard limit for the metadata-only call
    pub metadata_timeout_secs: u64,
    /// yt-dlp `--retries`
    pub retries: u32,
    /// Target bitrate when extracting audio
    pub audio_quality_kbps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            proxy: None,
            socket_timeout_secs: 30,
            metadata_timeout_secs: 60,
            retries: 5,
            audio_quality_kbps: DEFAULT_AUDIO_KBPS,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `YTDLP_PATH`, `YTDLP_PROXY`,
    /// `YTDLP_SOCKET_TIMEOUT` and `YTDLP_METADATA_TIMEOUT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = env_value("YTDLP_PATH") {
            config.ytdlp_path = Some(PathBuf::from(path));
        }
        if let Some(proxy) = env_value("YTDLP_PROXY") {
            config.proxy = Some(proxy);
        }
        if let Some(secs) = env_number("YTDLP_SOCKET_TIMEOUT") {
            config.socket_timeout_secs = secs;
        }
        if let Some(secs) = env_number("YTDLP_METADATA_TIMEOUT") {
            config.metadata_timeout_secs = secs;
        }

        config
    }

    pub fn with_ytdlp_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.ytdlp_path = path;
        }
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        if proxy.is_some() {
            self.proxy = proxy;
        }
        self
    }

    pub fn with_socket_timeout(mut self, seconds: Option<u32>) -> Self {
        if let Some(seconds) = seconds {
            self.socket_timeout_secs = seconds;
        }
        self
    }

    pub fn with_metadata_timeout(mut self, seconds: Option<u64>) -> Self {
        if let Some(seconds) = seconds {
            self.metadata_timeout_secs = seconds;
        }
        self
    }

    pub fn with_retries(mut self, retries: Option<u32>) -> Self {
        if let Some(retries) = retries {
            self.retries = retries;
        }
        self
    }

    pub fn with_audio_quality(mut self, kbps: u32) -> Self {
        self.audio_quality_kbps = kbps;
        self
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_value(key)?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring malformed numeric environment value");
            None
        }
    }
}
