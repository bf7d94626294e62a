//! Playlist download example
//!
//! This example demonstrates the core functionality of playlist-dl:
//! - Reading and deduplicating a playlist file
//! - Creating a downloader from a JSON config file and command-line flags
//! - Running with Ctrl+C / SIGTERM handling
//! - Printing the final summary
//!
//! ```bash
//! cargo run --example playlist_download -- playlist.txt --output music --workers 4
//! RUST_LOG=playlist_dl=debug cargo run --example playlist_download -- playlist.txt
//! ```

use std::path::PathBuf;

use clap::Parser;
use playlist_dl::{Config, Downloader, read_playlist, run_with_shutdown};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for the playlist downloader
#[derive(Parser, Debug)]
#[command(name = "playlist-download")]
#[command(about = "Download every `Artist - Title` line of a playlist as audio")]
#[command(version)]
struct Args {
    /// Playlist file, one `Artist - Title` per line
    #[arg(default_value = "playlist.txt")]
    playlist: PathBuf,

    /// Directory the audio files are written to
    #[arg(short, long, default_value = "music", env = "PLAYLIST_DL_OUTPUT")]
    output: PathBuf,

    /// JSON configuration file; flags below override its values
    #[arg(short, long, env = "PLAYLIST_DL_CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent downloads [default: 4]
    #[arg(short, long)]
    workers: Option<usize>,

    /// Extra attempts per track after the first one fails [default: 2]
    #[arg(short, long)]
    retries: Option<u32>,

    /// Proxy URL handed to the tool (http, https or socks)
    #[arg(short, long, env = "PLAYLIST_DL_PROXY")]
    proxy: Option<String>,

    /// File that failed lines are appended to [default: playlist-failed.txt]
    #[arg(long)]
    failed: Option<PathBuf>,

    /// Path to the yt-dlp binary (searched on PATH when omitted)
    #[arg(long, env = "YT_DLP_PATH")]
    yt_dlp: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout carries only progress lines
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playlist_dl=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_json(&tokio::fs::read_to_string(path).await?)?,
        None => Config::default(),
    };
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    if let Some(retries) = args.retries {
        config.retry.max_retries = retries;
    }
    if let Some(failed) = args.failed {
        config.failed_tracks_path = failed;
    }
    if args.yt_dlp.is_some() {
        config.tool.binary_path = args.yt_dlp;
    }

    let mut downloader = Downloader::with_config(config)?;
    if let Some(proxy) = args.proxy {
        downloader.set_proxy(proxy);
    }

    let tracks = read_playlist(&args.playlist).await?;
    println!("Found {} unique tracks", tracks.len());
    match downloader.config().proxy() {
        Some(proxy) => println!("Using proxy: {proxy}"),
        None => println!("Direct connection (no proxy)"),
    }

    let summary = run_with_shutdown(&downloader, tracks, &args.output).await?;

    if summary.cancelled {
        println!("Interrupted; unfinished tracks stay queued in the playlist");
    }
    if summary.failed > 0 {
        println!(
            "Failed tracks were appended to {}",
            downloader.config().failed_tracks_path.display()
        );
    }
    println!(
        "Finished in {}s",
        (summary.finished_at - summary.started_at).num_seconds()
    );

    Ok(())
}
