// yt-dlp engine - shells out to the native yt-dlp binary
//
// Metadata goes through `--dump-json --skip-download`; downloads stream a
// machine-readable `--progress-template` on stdout, one sample per line.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio_util::sync::CancellationToken;

use crate::downloader::config::EngineConfig;
use crate::downloader::errors::{EngineError, EngineErrorKind};
use crate::downloader::models::{PostProcess, ProgressSample, ProgressStatus, TransferSpec, VideoMetadata};
use crate::downloader::traits::{ExtractionEngine, ProgressCallback};
use crate::downloader::utils::{find_ytdlp, run_output_with_timeout, spawn_error, summarize_stderr};

/// Marker that prefixes our progress lines on stdout
const PROGRESS_MARKER: &str = "yt-fetch|";

const PROGRESS_TEMPLATE: &str = "download:yt-fetch|%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress._speed_str)s|%(progress._eta_str)s";

pub struct YtDlpEngine {
    ytdlp_path: PathBuf,
    config: EngineConfig,
}

impl YtDlpEngine {
    pub fn new(config: EngineConfig) -> Self {
        let ytdlp_path = config.ytdlp_path.clone().unwrap_or_else(find_ytdlp);
        tracing::debug!(path = %ytdlp_path.display(), "using yt-dlp binary");
        Self { ytdlp_path, config }
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-colors".to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout_secs.to_string(),
        ];
        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        args
    }

    fn metadata_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
        ];
        args.extend(self.common_args());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    fn download_args(&self, url: &str, spec: &TransferSpec, output_template: &Path) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            spec.format_selector.clone(),
            "-o".to_string(),
            output_template.to_string_lossy().to_string(),
            "--newline".to_string(),
            "--force-overwrites".to_string(),
            "--retries".to_string(),
            self.config.retries.to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
        ];
        args.extend(self.common_args());

        if let Some(container) = spec.merge_container {
            args.push("--merge-output-format".to_string());
            args.push(container.to_string());
        }

        if let Some(PostProcess::ExtractAudio { codec, quality_kbps }) = &spec.post_process {
            args.extend([
                "-x".to_string(),
                "--audio-format".to_string(),
                codec.to_string(),
                "--audio-quality".to_string(),
                format!("{}K", quality_kbps),
            ]);
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve_metadata(&self, url: &str) -> Result<VideoMetadata, EngineError> {
        let args = self.metadata_args(url);
        tracing::debug!(cmd = %format!("{} {}", self.ytdlp_path.display(), args.join(" ")), "resolving metadata");

        let output = run_output_with_timeout(&self.ytdlp_path, &args, self.config.metadata_timeout_secs).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::from(summarize_stderr(&stderr)));
        }

        parse_metadata(&output.stdout)
    }

    async fn download(
        &self,
        url: &str,
        spec: &TransferSpec,
        output_template: &Path,
        progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let args = self.download_args(url, spec, output_template);
        tracing::info!(cmd = %format!("{} {}", self.ytdlp_path.display(), args.join(" ")), "starting yt-dlp");

        let mut child = TokioCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.ytdlp_path, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::new(EngineErrorKind::Extractor, "Failed to capture yt-dlp stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::new(EngineErrorKind::Extractor, "Failed to capture yt-dlp stderr"))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::warn!("cancellation requested, killing yt-dlp");
                    let _ = child.kill().await;
                    stderr_task.abort();
                    return Err(EngineError::cancelled());
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match parse_progress_line(&line) {
                        Some(sample) => progress(sample),
                        None => tracing::debug!("[yt-dlp] {}", line),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed reading yt-dlp stdout");
                        break;
                    }
                }
            }
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(EngineError::cancelled());
            }
            status = child.wait() => status.map_err(|e| {
                EngineError::new(EngineErrorKind::Extractor, format!("yt-dlp process error: {}", e))
            })?,
        };
        let stderr_output = stderr_task.await.unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        for line in stderr_output.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!("[yt-dlp stderr] {}", line);
        }

        let summary = summarize_stderr(&stderr_output);
        let message = if summary.is_empty() {
            format!("yt-dlp exited with {}", status)
        } else {
            summary
        };
        Err(EngineError::from(message))
    }
}

fn parse_metadata(stdout: &[u8]) -> Result<VideoMetadata, EngineError> {
    let text = String::from_utf8_lossy(stdout);
    let first = text
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| EngineError::new(EngineErrorKind::Extractor, "yt-dlp returned no metadata"))?;

    let json: serde_json::Value = serde_json::from_str(first)
        .map_err(|e| EngineError::new(EngineErrorKind::Extractor, format!("Invalid JSON from yt-dlp: {}", e)))?;

    Ok(VideoMetadata {
        id: json["id"].as_str().unwrap_or("").to_string(),
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        uploader: json["uploader"].as_str().map(|s| s.to_string()),
        duration_seconds: json["duration"].as_f64().map(|d| d as u64),
    })
}

/// Parse a line produced by [`PROGRESS_TEMPLATE`]:
/// `yt-fetch|downloading|1024|4096|NA| 1.00KiB/s|00:03`
fn parse_progress_line(line: &str) -> Option<ProgressSample> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let fields: Vec<&str> = rest.split('|').map(str::trim).collect();
    if fields.len() < 6 {
        return None;
    }

    let status = match fields[0] {
        "downloading" => ProgressStatus::Downloading,
        "finished" => ProgressStatus::Finished,
        _ => return None,
    };

    Some(ProgressSample {
        status,
        downloaded_bytes: parse_number(fields[1]).map(|n| n as u64).unwrap_or(0),
        total_bytes: parse_number(fields[2]).map(|n| n as u64),
        total_bytes_estimate: parse_number(fields[3]),
        speed_summary: parse_text(fields[4]),
        eta_summary: parse_text(fields[5]),
    })
}

fn parse_number(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0)
}

fn parse_text(field: &str) -> Option<String> {
    match field {
        "" | "NA" | "None" | "Unknown" => None,
        other => Some(other.to_string()),
    }
}
