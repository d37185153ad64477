// Placement resolver
//
// yt-dlp picks the final extension itself, so the staged artifact is found by
// trying a ranked list of matchers and taking the first hit:
//   1. {ticket}.{expected_ext}
//   2. any {ticket}*.{expected_ext}
//   3. any {ticket}*.{container} for each known container fallback

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::errors::DownloadError;
use super::format_selector::CONTAINER_FALLBACKS;
use super::models::StagingTicket;
use super::traits::ProgressEmitter;

/// One way of recognising the staged artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateMatcher {
    /// `{ticket}.{ext}` exactly
    Exact { ext: String },
    /// Any entry owned by the ticket whose name ends in `.{ext}`
    TicketExtension { ext: String },
}

impl CandidateMatcher {
    /// Matchers in the order they are tried
    pub fn ranked(expected_ext: &str) -> Vec<Self> {
        let mut matchers = vec![
            Self::Exact {
                ext: expected_ext.to_string(),
            },
            Self::TicketExtension {
                ext: expected_ext.to_string(),
            },
        ];
        matchers.extend(
            CONTAINER_FALLBACKS
                .iter()
                .filter(|c| **c != expected_ext)
                .map(|c| Self::TicketExtension { ext: c.to_string() }),
        );
        matchers
    }

    fn matches(&self, ticket: &StagingTicket, file_name: &str) -> bool {
        match self {
            Self::Exact { ext } => file_name == format!("{}.{}", ticket, ext),
            Self::TicketExtension { ext } => {
                ticket.owns(file_name) && file_name.ends_with(&format!(".{}", ext))
            }
        }
    }
}

/// Sorted names of regular files in `directory`
async fn list_files(directory: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = fs::read_dir(directory).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Locate the staged artifact, trying matchers in rank order.
pub async fn locate_artifact(
    directory: &Path,
    ticket: &StagingTicket,
    expected_ext: &str,
) -> io::Result<Option<PathBuf>> {
    let exact = ticket.expected_artifact(directory, expected_ext);
    if fs::metadata(&exact).await.map(|m| m.is_file()).unwrap_or(false) {
        return Ok(Some(exact));
    }

    let names = list_files(directory).await?;
    for matcher in CandidateMatcher::ranked(expected_ext) {
        if let Some(name) = names.iter().find(|n| matcher.matches(ticket, n)) {
            tracing::debug!(?matcher, file = %name, "staged artifact matched");
            return Ok(Some(directory.join(name)));
        }
    }

    Ok(None)
}

/// Move the staged artifact to `final_path`.
///
/// An existing `final_path` is removed first, which is only allowed when
/// `overwrite` is set or the file appeared after the existence check.
pub async fn place(
    directory: &Path,
    ticket: &StagingTicket,
    expected_ext: &str,
    final_path: &Path,
    overwrite: bool,
    emitter: &ProgressEmitter,
) -> Result<PathBuf, DownloadError> {
    let expected = ticket.expected_artifact(directory, expected_ext);

    let source = match locate_artifact(directory, ticket, expected_ext).await? {
        Some(source) => source,
        None => {
            emitter.log(format!(
                "Looking for downloaded file (temp file not found at: {})",
                expected.display()
            ));
            emitter.log("Warning: Could not find the downloaded file. It may be saved with a different name.");
            emitter.log(format!("Check the {} directory for new files.", directory.display()));
            return Err(DownloadError::Placement {
                directory: directory.to_path_buf(),
            });
        }
    };

    if source != expected {
        emitter.log(format!(
            "Looking for downloaded file (temp file not found at: {})",
            expected.display()
        ));
        tracing::info!(source = %source.display(), "using fallback staging artifact");
    }

    if fs::metadata(final_path).await.is_ok() {
        if !overwrite {
            tracing::warn!(path = %final_path.display(), "final file appeared during the transfer; last writer wins");
        }
        fs::remove_file(final_path).await?;
    }

    relocate(&source, final_path).await?;
    Ok(source)
}

/// Rename, falling back to copy + delete across file systems.
///
/// The source is removed only after the copy is flushed and its size checked.
pub async fn relocate(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination).await {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "rename failed, copying instead");
        }
    }

    copy_or_discard(source, destination).await?;
    fs::remove_file(source).await
}

/// A failed copy never leaves a partial destination behind.
async fn copy_or_discard(source: &Path, destination: &Path) -> io::Result<()> {
    let result = copy_confirmed(source, destination).await;
    if result.is_err() {
        let _ = fs::remove_file(destination).await;
    }
    result
}

async fn copy_confirmed(source: &Path, destination: &Path) -> io::Result<()> {
    let copied = fs::copy(source, destination).await?;
    fs::File::open(destination).await?.sync_all().await?;

    let expected = fs::metadata(source).await?.len();
    let on_disk = fs::metadata(destination).await?.len();
    ensure_complete(copied, expected, on_disk, destination)
}

fn ensure_complete(copied: u64, expected: u64, on_disk: u64, destination: &Path) -> io::Result<()> {
    if copied != expected || on_disk != expected {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("short copy to {} ({} of {} bytes)", destination.display(), on_disk, expected),
        ));
    }
    Ok(())
}

/// Best-effort removal of leftover files owned by `ticket`.
pub async fn sweep_staging(directory: &Path, ticket: &StagingTicket) -> Vec<PathBuf> {
    let names = match list_files(directory).await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(error = %e, "could not list directory for staging cleanup");
            return Vec::new();
        }
    };

    let mut removed = Vec::new();
    for name in names.into_iter().filter(|n| ticket.owns(n)) {
        let path = directory.join(&name);
        match fs::remove_file(&path).await {
            Ok(()) => removed.push(path),
            Err(e) => tracing::warn!(file = %name, error = %e, "failed to remove staging artifact"),
        }
    }

    if !removed.is_empty() {
        tracing::debug!(ticket = %ticket, count = removed.len(), "removed staging leftovers");
    }
    removed
}
