//! Outcome classification
//!
//! Success is decided by the filesystem, never by the tool's exit code: if a
//! temp-suffixed file for the track exists after the tool exits, it is renamed to
//! its final name and the attempt succeeded. Otherwise the captured error stream
//! is searched for keywords, network indicators first.

use crate::tool::ToolTranscript;
use crate::types::{DownloadOutcome, FailureReason, TrackFailure, TrackSuccess};
use crate::utils::find_temp;
use std::path::Path;

/// Error-text fragments that indicate a network, proxy or HTTP problem
///
/// Matched case-insensitively. Checked before [`NOT_FOUND_KEYWORDS`].
pub const NETWORK_KEYWORDS: &[&str] = &[
    "connection",
    "proxy",
    "timeout",
    "timed out",
    "network",
    "dns",
    "ssl",
    "tls",
    "certificate",
    "host",
    "refused",
    "unreachable",
    "blocked",
    "403",
    "500",
    "502",
    "503",
    "unable to download",
    "httperror",
    "http error",
    "urlerror",
    "no such host",
];

/// Error-text fragments that indicate the catalog had no usable entry
pub const NOT_FOUND_KEYWORDS: &[&str] = &[
    "no video",
    "not found",
    "no matches",
    "no results",
    "unable to find",
    "no suitable",
    "this video is not available",
    "video unavailable",
    "not available",
    "private video",
    "deleted video",
    "age-restricted",
];

/// Message used when the tool failed without writing anything to stderr
pub const GENERIC_FAILURE_MESSAGE: &str = "Unknown error occurred";

/// Classify captured error text into a failure
///
/// Keyword groups are checked in order and the first match wins, so text that
/// mentions both a network problem and a missing video is a network error.
///
/// # Examples
///
/// ```
/// use playlist_dl::classifier::classify_error_output;
/// use playlist_dl::FailureReason;
///
/// let failure = classify_error_output("ERROR: Video unavailable");
/// assert_eq!(failure.reason, FailureReason::NotFound);
///
/// let failure = classify_error_output("");
/// assert_eq!(failure.reason, FailureReason::UnknownError);
/// assert_eq!(failure.message, "Unknown error occurred");
/// ```
pub fn classify_error_output(error_output: &str) -> TrackFailure {
    let lower = error_output.to_lowercase();
    let trimmed = error_output.trim();

    if NETWORK_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return TrackFailure::new(
            FailureReason::NetworkError,
            format!("Network error: {trimmed}"),
        );
    }

    if NOT_FOUND_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return TrackFailure::new(
            FailureReason::NotFound,
            format!("Track not found: {trimmed}"),
        );
    }

    if !trimmed.is_empty() {
        return TrackFailure::new(
            FailureReason::UnknownError,
            format!("Unknown error: {trimmed}"),
        );
    }

    TrackFailure::new(FailureReason::UnknownError, GENERIC_FAILURE_MESSAGE)
}

/// Decide the outcome of a finished tool run
///
/// Looks for a temp file for `safe_name` in `output_dir`. If one exists it is
/// atomically renamed to its final name; if the rename fails the temp file is
/// deleted so it cannot be mistaken for a completed download later. Without a
/// temp file the transcript's stderr is classified.
pub async fn classify_attempt(
    output_dir: &Path,
    safe_name: &str,
    transcript: &ToolTranscript,
) -> DownloadOutcome {
    if let Some((temp, final_path)) = find_temp(output_dir, safe_name).await {
        return match tokio::fs::rename(&temp, &final_path).await {
            Ok(()) => {
                tracing::debug!(path = ?final_path, "finalized download");
                Ok(TrackSuccess::Downloaded(final_path))
            }
            Err(e) => {
                tracing::warn!(?temp, error = %e, "rename of finished download failed");
                if let Err(remove_err) = tokio::fs::remove_file(&temp).await {
                    tracing::warn!(?temp, error = %remove_err, "failed to remove temp file");
                }
                Err(TrackFailure::new(
                    FailureReason::UnknownError,
                    format!("Failed to rename temp file: {e}"),
                ))
            }
        };
    }

    if !transcript.status.is_success() {
        tracing::debug!(status = ?transcript.status, "tool exited unsuccessfully without output file");
    }

    Err(classify_error_output(&transcript.stderr))
}
