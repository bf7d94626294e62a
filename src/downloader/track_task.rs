//! Track download unit: skip check, one tool attempt, classification, retry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::classifier::classify_attempt;
use crate::config::Config;
use crate::error::Error;
use crate::progress::Reporter;
use crate::retry::download_with_retry;
use crate::tool::{AcquisitionTool, FetchRequest, MilestoneTracker};
use crate::types::{DownloadOutcome, Event, FailureReason, Track, TrackFailure, TrackSuccess};
use crate::utils::{find_existing, output_template, purge_stale_temp, sanitize_filename};

/// State shared by every track processed in one run
#[derive(Clone)]
pub(crate) struct TrackContext {
    pub(crate) config: Arc<Config>,
    pub(crate) tool: Arc<dyn AcquisitionTool>,
    pub(crate) reporter: Reporter,
    pub(crate) output_dir: Arc<PathBuf>,
    pub(crate) cancel: CancellationToken,
    pub(crate) name_locks: Arc<NameLocks>,
}

/// Serializes tracks whose lines sanitize to the same file name
///
/// Distinct lines such as `A/B - C` and `A:B - C` share one output base, so
/// their temp files and stale-temp purges would collide if run concurrently.
#[derive(Debug, Default)]
pub(crate) struct NameLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl NameLocks {
    pub(crate) fn lock_for(&self, safe_name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(safe_name.to_string()).or_default())
    }
}

impl TrackContext {
    /// Run one track to its terminal outcome, retrying failed attempts
    ///
    /// Holds the track's name lock for all attempts, so a colliding line waits
    /// and then finds the finished file through the skip check.
    pub(crate) async fn process_track(&self, track: &Track) -> DownloadOutcome {
        let raw = track.raw.as_str();
        let name_lock = self
            .name_locks
            .lock_for(&sanitize_filename(&track.display_name()));
        let _guard = tokio::select! {
            biased;
            guard = name_lock.lock() => guard,
            _ = self.cancel.cancelled() => return Err(TrackFailure::cancelled()),
        };

        let outcome = download_with_retry(
            &self.config.retry,
            &self.cancel,
            |attempt| self.download_track(track, attempt),
            |attempt, failure: &TrackFailure, delay| {
                self.reporter.emit(Event::Retrying {
                    track: raw.to_string(),
                    attempt,
                    delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    reason: failure.reason,
                });
            },
        )
        .await;

        if let Ok(success) = &outcome {
            tracing::debug!(track = raw, path = ?success.path(), "track finished");
        }
        outcome
    }

    /// One attempt at one track
    ///
    /// An existing final file short-circuits to [`TrackSuccess::Skipped`] without
    /// invoking the tool.
    pub(crate) async fn download_track(&self, track: &Track, attempt: u32) -> DownloadOutcome {
        let safe_name = sanitize_filename(&track.display_name());
        let output_dir = self.output_dir.as_path();

        if self.config.skip_existing {
            if let Some(existing) = find_existing(output_dir, &safe_name).await {
                tracing::debug!(track = %track.raw, path = ?existing, "final file already exists");
                return Ok(TrackSuccess::Skipped(existing));
            }
        }

        if self.cancel.is_cancelled() {
            return Err(TrackFailure::cancelled());
        }

        let purged = purge_stale_temp(output_dir, &safe_name).await;
        if purged > 0 {
            tracing::debug!(track = %track.raw, purged, "purged stale temp files before attempt");
        }

        let query = track.query();
        tracing::debug!(track = %track.raw, attempt, tool = self.tool.name(), "starting attempt");
        self.reporter.print(format_args!("Searching: {query}"));
        self.reporter.emit(Event::Searching {
            query: query.clone(),
        });

        let request = FetchRequest {
            query: query.clone(),
            output_template: output_template(output_dir, &safe_name),
            proxy: self.config.proxy().map(str::to_string),
            audio: self.config.audio.clone(),
        };
        let milestones = MilestoneTracker::new(query, self.reporter.clone());

        match self.tool.fetch(&request, &milestones, &self.cancel).await {
            Ok(transcript) => classify_attempt(output_dir, &safe_name, &transcript).await,
            Err(Error::Cancelled) => {
                // the killed process may have left a partial temp file behind
                purge_stale_temp(output_dir, &safe_name).await;
                Err(TrackFailure::cancelled())
            }
            Err(Error::ExternalTool(message)) => {
                tracing::warn!(track = %track.raw, attempt, error = %message, "tool invocation failed");
                Err(TrackFailure::new(FailureReason::UnknownError, message))
            }
            Err(e) => {
                tracing::warn!(track = %track.raw, attempt, error = %e, "tool invocation failed");
                Err(TrackFailure::new(FailureReason::UnknownError, e.to_string()))
            }
        }
    }
}
