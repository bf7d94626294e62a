//! # playlist-dl
//!
//! Concurrent bulk downloader for `Artist - Title` playlists.
//!
//! Each track is searched for and fetched by an external acquisition tool
//! (`yt-dlp` by default) running as a subprocess. The crate owns everything
//! around it: a fixed-size worker pool, retries with backoff, skipping tracks
//! that are already on disk, atomic finalization through temp files, outcome
//! classification, and a failure log that is written as failures happen and
//! can be fed back in as a playlist.
//!
//! ## Quick Start
//!
//! ```no_run
//! use playlist_dl::{Downloader, read_playlist};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracks = read_playlist("playlist.txt").await?;
//!
//!     let mut downloader = Downloader::new(4);
//!     downloader.set_proxy("socks5://127.0.0.1:1080");
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = downloader.run(tracks, "music").await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Outcome classification of tool runs
pub mod classifier;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Playlist parsing
pub mod playlist;
/// Progress lines and run counters
pub mod progress;
/// Retry logic with backoff
pub mod retry;
/// External acquisition tool adapter
pub mod tool;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{AudioConfig, Backoff, Config, RetryConfig, ToolConfig};
pub use downloader::{Downloader, FailureLog};
pub use error::{Error, Result};
pub use playlist::{parse_playlist, read_playlist};
pub use tool::{AcquisitionTool, FetchRequest, MilestoneTracker, ToolTranscript, YtDlpTool};
pub use types::{
    DownloadOutcome, Event, FailureReason, RunSummary, Track, TrackFailure, TrackStatus,
    TrackSuccess,
};

use std::path::Path;

/// Run a download and cancel it when a termination signal arrives.
///
/// Resolves with the run's summary either way; after a signal the summary has
/// `cancelled` set and the interrupted tracks are in the failure log.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use playlist_dl::{Downloader, read_playlist, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let tracks = read_playlist("playlist.txt").await?;
///     let downloader = Downloader::new(4);
///
///     // Run with automatic signal handling
///     let summary = run_with_shutdown(&downloader, tracks, "music").await?;
///     println!("{summary}");
///
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// Returns the same precondition errors as [`Downloader::run`].
pub async fn run_with_shutdown(
    downloader: &Downloader,
    tracks: Vec<Track>,
    output_dir: impl AsRef<Path>,
) -> Result<RunSummary> {
    let run = downloader.run(tracks, output_dir);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = wait_for_signal() => {
            downloader.shutdown();
            run.await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    async fn recv(signal: Option<&mut Signal>) {
        match signal {
            Some(signal) => {
                signal.recv().await;
            }
            None => std::future::pending().await,
        }
    }

    // Registration may fail in restricted environments (containers, tests)
    let mut sigterm = signal(SignalKind::terminate())
        .inspect_err(|e| tracing::warn!(error = %e, "Could not register SIGTERM handler"))
        .ok();
    let mut sigint = signal(SignalKind::interrupt())
        .inspect_err(|e| tracing::warn!(error = %e, "Could not register SIGINT handler"))
        .ok();

    if sigterm.is_none() && sigint.is_none() {
        tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received Ctrl+C signal");
        return;
    }

    tokio::select! {
        _ = recv(sigterm.as_mut()) => tracing::info!("Received SIGTERM signal"),
        _ = recv(sigint.as_mut()) => tracing::info!("Received SIGINT signal (Ctrl+C)"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
