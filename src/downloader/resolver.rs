// Metadata resolver - title lookup without transferring media

use super::errors::DownloadError;
use super::models::VideoMetadata;
use super::traits::ExtractionEngine;

/// Ask the engine for metadata only. Engine text is kept verbatim on failure.
pub async fn resolve(engine: &dyn ExtractionEngine, source_url: &str) -> Result<VideoMetadata, DownloadError> {
    tracing::debug!(engine = engine.name(), url = source_url, "resolving metadata");

    engine
        .resolve_metadata(source_url)
        .await
        .map_err(|e| DownloadError::Resolution(e.message))
}
