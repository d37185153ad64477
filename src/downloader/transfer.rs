// Staging transfer executor
//
// Runs the engine against the per-operation staging template and turns each
// progress callback into at most one Progress event and at most one LogLine.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::errors::DownloadError;
use super::models::{ProgressSample, ProgressStatus, TransferSpec};
use super::traits::{ExtractionEngine, ProgressEmitter};

pub const POST_PROCESSING_NOTICE: &str = "Download completed, now processing...";

/// floor(downloaded / total * 100), clamped to 0..=100.
///
/// Uses the exact total when known and positive, else the estimate; `None`
/// when neither is usable.
pub fn percent_of(sample: &ProgressSample) -> Option<u8> {
    let total = sample
        .total_bytes
        .filter(|t| *t > 0)
        .map(|t| t as f64)
        .or_else(|| sample.total_bytes_estimate.filter(|t| t.is_finite() && *t > 0.0))?;

    let ratio = sample.downloaded_bytes as f64 / total * 100.0;
    Some(ratio.floor().clamp(0.0, 100.0) as u8)
}

/// Speed/ETA summary line, only when the engine supplied one of them
pub fn progress_summary(sample: &ProgressSample, percent: Option<u8>) -> Option<String> {
    if sample.speed_summary.is_none() && sample.eta_summary.is_none() {
        return None;
    }

    let percent = percent.map_or_else(|| "?".to_string(), |p| format!("{}%", p));
    Some(format!(
        "Progress: {} | Speed: {} | ETA: {}",
        percent,
        sample.speed_summary.as_deref().unwrap_or("?"),
        sample.eta_summary.as_deref().unwrap_or("?"),
    ))
}

fn forward_sample(emitter: &ProgressEmitter, sample: ProgressSample) {
    let percent = percent_of(&sample);
    if let Some(p) = percent {
        emitter.progress(p);
    }

    match sample.status {
        ProgressStatus::Downloading => {
            if let Some(line) = progress_summary(&sample, percent) {
                emitter.log(line);
            }
        }
        ProgressStatus::Finished => emitter.log(POST_PROCESSING_NOTICE),
    }
}

/// Download into `{ticket}.%(ext)s`; engine failures become `Transfer` errors.
pub async fn execute(
    engine: &dyn ExtractionEngine,
    source_url: &str,
    staging_template: &Path,
    spec: &TransferSpec,
    emitter: &ProgressEmitter,
    cancel: &CancellationToken,
) -> Result<(), DownloadError> {
    let forward = |sample: ProgressSample| forward_sample(emitter, sample);

    engine
        .download(source_url, spec, staging_template, &forward, cancel)
        .await
        .map_err(|e| {
            tracing::warn!(kind = %e.kind, error = %e.message, "transfer failed");
            DownloadError::Transfer {
                kind: e.kind,
                message: e.message,
            }
        })
}
