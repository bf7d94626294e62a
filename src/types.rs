//! Core types for playlist-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One playlist entry
///
/// `raw` is the trimmed original line. It is the track's identity within a run and
/// the exact text written to the failure log.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    /// Artist name
    pub artist: String,
    /// Song title (may itself contain " - ")
    pub title: String,
    /// Original playlist line
    pub raw: String,
}

impl Track {
    /// Create a track from its parts
    pub fn new(artist: impl Into<String>, title: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            raw: raw.into(),
        }
    }

    /// Search text handed to the acquisition tool ("artist title")
    pub fn query(&self) -> String {
        format!("{} {}", self.artist, self.title)
    }

    /// Display name used for the output filename ("artist - title") before sanitizing
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Why a track attempt failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Network, proxy, TLS or HTTP-level problem
    NetworkError,
    /// No catalog entry matched the query, or the entry is unavailable
    NotFound,
    /// Anything else, including infrastructure failures
    UnknownError,
}

impl FailureReason {
    /// Short label used in progress lines
    pub fn label(self) -> &'static str {
        match self {
            FailureReason::NetworkError => "Network/proxy error",
            FailureReason::NotFound => "Track not found",
            FailureReason::UnknownError => "Unknown error",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A successful attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackSuccess {
    /// The tool produced a new file, now at its final name
    Downloaded(PathBuf),
    /// A file with a recognized extension already existed; the tool was not run
    Skipped(PathBuf),
}

impl TrackSuccess {
    /// Final path of the audio file
    pub fn path(&self) -> &Path {
        match self {
            TrackSuccess::Downloaded(p) | TrackSuccess::Skipped(p) => p,
        }
    }
}

/// A failed attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackFailure {
    /// Classified reason
    pub reason: FailureReason,
    /// Free-text diagnostic
    pub message: String,
    pub(crate) cancelled: bool,
}

impl TrackFailure {
    /// Create a failure with the given reason and message
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            cancelled: false,
        }
    }

    /// Failure recorded for a track whose attempt was interrupted by cancellation
    pub fn cancelled() -> Self {
        Self {
            reason: FailureReason::UnknownError,
            message: "download cancelled".to_string(),
            cancelled: true,
        }
    }

    /// Whether this failure came from cancelling the run
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl std::fmt::Display for TrackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}

/// Result of one attempt at one track
pub type DownloadOutcome = std::result::Result<TrackSuccess, TrackFailure>;

/// Terminal status of a track, as counted by the run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    /// Newly downloaded
    Downloaded,
    /// Already present in the output directory
    Skipped,
    /// All attempts failed
    Failed,
}

impl TrackStatus {
    /// Status derived from a final outcome
    pub fn of(outcome: &DownloadOutcome) -> Self {
        match outcome {
            Ok(TrackSuccess::Downloaded(_)) => TrackStatus::Downloaded,
            Ok(TrackSuccess::Skipped(_)) => TrackStatus::Skipped,
            Err(_) => TrackStatus::Failed,
        }
    }

    /// Label used in progress lines
    pub fn label(self) -> &'static str {
        match self {
            TrackStatus::Downloaded => "Downloaded",
            TrackStatus::Skipped => "Already exists",
            TrackStatus::Failed => "Failed",
        }
    }
}

/// Aggregate counts of a finished run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of tracks handed to the run
    pub total: usize,
    /// Tracks newly downloaded
    pub downloaded: usize,
    /// Tracks skipped because the file already existed
    pub skipped: usize,
    /// Tracks that failed every attempt
    pub failed: usize,
    /// Failed tracks durably appended to the failure log
    pub failures_persisted: usize,
    /// Whether the run was cancelled before the queue drained
    pub cancelled: bool,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished (including failure-log flush)
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Tracks that reached a terminal outcome
    pub fn completed(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Download completed:")?;
        writeln!(f, "Downloaded: {}", self.downloaded)?;
        writeln!(f, "Skipped (already existed): {}", self.skipped)?;
        write!(f, "Failed: {}", self.failed)
    }
}

/// Event emitted by the downloader
///
/// Consumers subscribe through [`Downloader::subscribe`](crate::Downloader::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A run started
    RunStarted {
        /// Number of tracks in the run
        total: usize,
        /// Number of concurrent workers
        workers: usize,
    },

    /// An attempt started searching the catalog
    Searching {
        /// Search query
        query: String,
    },

    /// The tool reported a catalog hit
    Found {
        /// Search query
        query: String,
    },

    /// The tool started transferring media
    Transferring {
        /// Search query
        query: String,
    },

    /// An attempt failed and another one is scheduled
    Retrying {
        /// Raw playlist line
        track: String,
        /// Number of attempts made so far
        attempt: u32,
        /// Delay before the next attempt
        delay_ms: u64,
        /// Reason the attempt failed
        reason: FailureReason,
    },

    /// A track reached its terminal outcome
    TrackFinished {
        /// Run-wide completion number (1-based, strictly increasing)
        sequence: usize,
        /// Number of tracks in the run
        total: usize,
        /// Raw playlist line
        track: String,
        /// Terminal status
        status: TrackStatus,
        /// Failure reason when `status` is `Failed`
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<FailureReason>,
    },

    /// A failed track was flushed to the failure log
    FailurePersisted {
        /// Raw playlist line
        track: String,
    },

    /// A run finished and the failure log is closed
    RunComplete {
        /// Final counts
        summary: RunSummary,
    },
}
