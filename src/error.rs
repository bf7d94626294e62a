//! Error types for playlist-dl
//!
//! Two layers of failure exist in this crate:
//! - [`Error`] covers fatal preconditions (missing tool, unreadable playlist,
//!   uncreatable output directory) and infrastructure problems. These abort a run
//!   before any track is processed.
//! - Per-attempt track failures are plain values ([`crate::types::TrackFailure`])
//!   that the retry loop recovers from and the worker pool counts. They never
//!   surface as an `Error`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for playlist-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for playlist-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "worker_count")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Playlist file could not be read
    #[error("failed to read playlist {path}: {source}")]
    Playlist {
        /// Playlist path that was requested
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Output directory could not be created or scanned
    #[error("output directory {path} is unusable: {source}")]
    OutputDir {
        /// Output directory path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failure log could not be opened or written
    #[error("failed-tracks log {path} is unusable: {source}")]
    FailureLog {
        /// Failure log path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The acquisition tool could not be resolved (neither directly nor via an interpreter)
    #[error("acquisition tool not found: {0}")]
    ToolNotFound(String),

    /// External tool execution failed (spawn failure, missing pipe, wait failure)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// The run was cancelled before the operation finished
    #[error("operation cancelled")]
    Cancelled,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Whether this error aborts a run before any track is processed
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::Playlist { .. }
                | Error::OutputDir { .. }
                | Error::FailureLog { .. }
                | Error::ToolNotFound(_)
        )
    }
}
