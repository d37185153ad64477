// Helper functions for the engine adapter

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::{EngineError, EngineErrorKind};

/// Run command with timeout, collecting stdout and stderr
pub async fn run_output_with_timeout(
    program: &Path,
    args: &[String],
    timeout_secs: u64,
) -> Result<std::process::Output, EngineError> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        EngineError::new(
            EngineErrorKind::Extractor,
            format!("Failed to capture stdout from {}", program.display()),
        )
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        EngineError::new(
            EngineErrorKind::Extractor,
            format!("Failed to capture stderr from {}", program.display()),
        )
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status_res) => {
            let status = status_res.map_err(|e| {
                EngineError::new(
                    EngineErrorKind::Extractor,
                    format!("Failed to wait for {}: {}", program.display(), e),
                )
            })?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(EngineError::new(
                EngineErrorKind::Network,
                format!("{} timed out after {}s", program.display(), timeout_secs),
            ))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>, EngineError> {
    task.await
        .map_err(|e| EngineError::new(EngineErrorKind::Extractor, format!("{} task failed: {}", name, e)))?
        .map_err(|e| EngineError::new(EngineErrorKind::Extractor, format!("Failed to read {}: {}", name, e)))
}

pub fn spawn_error(program: &Path, err: std::io::Error) -> EngineError {
    let kind = if err.kind() == std::io::ErrorKind::NotFound {
        EngineErrorKind::ToolNotFound
    } else {
        EngineErrorKind::Extractor
    };
    EngineError::new(kind, format!("Failed to start {}: {}", program.display(), err))
}

/// Find yt-dlp executable in common paths
pub fn find_ytdlp() -> PathBuf {
    let bin_name = if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    };

    if let Some(found) = candidate_paths(bin_name, dirs::home_dir())
        .into_iter()
        .find(|p| p.exists())
    {
        return found;
    }

    if let Ok(output) = std::process::Command::new("which").arg(bin_name).output() {
        if output.status.success() {
            let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !found.is_empty() {
                return PathBuf::from(found);
            }
        }
    }

    // Last resort: hope it's in PATH
    PathBuf::from(bin_name)
}

/// Install locations checked before asking `which`, in order
fn candidate_paths(bin_name: &str, home: Option<PathBuf>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"]
        .iter()
        .map(|dir| Path::new(dir).join(bin_name))
        .collect();
    paths.extend(home.map(|h| h.join(".local").join("bin").join(bin_name)));
    paths
}

/// Last `ERROR:` line of yt-dlp stderr, or the whole trimmed text
pub fn summarize_stderr(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with("ERROR:"))
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| stderr.trim().to_string())
}
