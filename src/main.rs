use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use yt_fetch_lib::downloader::{FormatSelector, YtDlpEngine};
use yt_fetch_lib::{DownloadRequest, Downloader, EngineConfig, Event, FormatType, Outcome, Quality};

/// Download a video (or just its audio) with yt-dlp
#[derive(Debug, Parser)]
#[command(name = "yt-fetch", version, about)]
struct Cli {
    /// Video URL
    url: String,

    /// Directory to save into (must exist)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// File name to use instead of the video title (without extension)
    #[arg(short, long)]
    name: Option<String>,

    /// low, medium or high (video only)
    #[arg(short, long, default_value = "high")]
    quality: Quality,

    /// video or audio
    #[arg(short, long, default_value = "video")]
    format: FormatType,

    /// Re-download even if the file already exists
    #[arg(long)]
    force: bool,

    /// Path to the yt-dlp binary
    #[arg(long, env = "YTDLP_PATH")]
    ytdlp: Option<PathBuf>,

    /// Proxy URL handed to yt-dlp
    #[arg(long, env = "YTDLP_PROXY")]
    proxy: Option<String>,

    /// yt-dlp socket timeout in seconds
    #[arg(long)]
    socket_timeout: Option<u32>,

    /// Time limit in seconds for the metadata lookup
    #[arg(long)]
    metadata_timeout: Option<u64>,

    /// How many times yt-dlp retries a failed request
    #[arg(long)]
    retries: Option<u32>,

    /// MP3 bitrate in kbps for audio downloads
    #[arg(long, default_value_t = 192)]
    audio_quality: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let dir = match cli.dir {
        Some(dir) => dir,
        None => dirs::download_dir()
            .ok_or_else(|| anyhow::anyhow!("No download directory found; pass --dir"))?,
    };

    let config = EngineConfig::from_env()
        .with_ytdlp_path(cli.ytdlp)
        .with_proxy(cli.proxy)
        .with_socket_timeout(cli.socket_timeout)
        .with_metadata_timeout(cli.metadata_timeout)
        .with_retries(cli.retries)
        .with_audio_quality(cli.audio_quality);
    let selector = FormatSelector::new(config.audio_quality_kbps);
    let downloader = Downloader::new(Arc::new(YtDlpEngine::new(config))).with_format_selector(selector);

    let request = DownloadRequest::new(cli.url, dir)
        .with_base_name(cli.name)
        .with_quality(cli.quality)
        .with_format(cli.format)
        .with_force_overwrite(cli.force);

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let handle = downloader.start(request, Arc::new(tx));

    let mut stdout = std::io::stdout();
    let mut last_percent = None;
    let mut outcome = Outcome::Failed;

    while let Some(event) = rx.recv().await {
        match event {
            Event::Progress { percent } => {
                if last_percent != Some(percent) {
                    write!(stdout, "\r[{:>3}%]", percent)?;
                    stdout.flush()?;
                    last_percent = Some(percent);
                }
            }
            Event::LogLine { text } => {
                if last_percent.take().is_some() {
                    writeln!(stdout)?;
                }
                writeln!(stdout, "{}", text)?;
            }
            Event::Terminal { outcome: result, message } => {
                if last_percent.take().is_some() {
                    writeln!(stdout)?;
                }
                writeln!(stdout, "{}", message)?;
                outcome = result;
                break;
            }
        }
    }

    handle.join().await;

    if outcome == Outcome::Failed {
        std::process::exit(1);
    }
    Ok(())
}
