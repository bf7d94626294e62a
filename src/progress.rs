//! Progress reporting and run counters
//!
//! [`RunCounters`] is the only state mutated by every worker. A single lock covers
//! the counter increment *and* the progress line that announces it, so displayed
//! completion numbers are strictly increasing across workers with no gaps or
//! duplicates.

use crate::types::{DownloadOutcome, Event, Track, TrackStatus};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// Fan-out for user-facing progress: stdout lines and broadcast events
#[derive(Clone, Debug)]
pub struct Reporter {
    event_tx: broadcast::Sender<Event>,
    print: bool,
}

impl Reporter {
    /// Create a reporter that broadcasts on `event_tx` and optionally prints
    pub fn new(event_tx: broadcast::Sender<Event>, print: bool) -> Self {
        Self { event_tx, print }
    }

    /// Broadcast an event; having no subscribers is fine
    pub fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Print a progress line to stdout if printing is enabled
    pub fn print(&self, line: impl std::fmt::Display) {
        if self.print {
            println!("{line}");
        }
    }
}

/// Terminal-outcome counts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    /// Tracks newly downloaded
    pub downloaded: usize,
    /// Tracks already present
    pub skipped: usize,
    /// Tracks that failed every attempt
    pub failed: usize,
}

impl Counts {
    /// Number of tracks that reached a terminal outcome
    pub fn completed(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }
}

/// One `[n/total] Status: raw [reason]` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLine<'a> {
    /// Completion number
    pub sequence: usize,
    /// Tracks in the run
    pub total: usize,
    /// Terminal status
    pub status: TrackStatus,
    /// The track
    pub track: &'a Track,
    /// Failure label, for failed tracks
    pub reason: Option<&'static str>,
}

impl std::fmt::Display for ProgressLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {}: {}",
            self.sequence,
            self.total,
            self.status.label(),
            self.track.raw
        )?;
        if let Some(reason) = self.reason {
            write!(f, " [{reason}]")?;
        }
        Ok(())
    }
}

/// Shared counters for one run
#[derive(Debug)]
pub struct RunCounters {
    total: usize,
    counts: Mutex<Counts>,
}

impl RunCounters {
    /// Counters for a run of `total` tracks
    pub fn new(total: usize) -> Self {
        Self {
            total,
            counts: Mutex::new(Counts::default()),
        }
    }

    /// Tracks in the run
    pub fn total(&self) -> usize {
        self.total
    }

    /// Record one terminal outcome and announce it
    ///
    /// Increments exactly one counter, then prints and broadcasts the progress line
    /// while still holding the lock. Returns the completion number assigned.
    pub fn record(&self, track: &Track, outcome: &DownloadOutcome, reporter: &Reporter) -> usize {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);

        let status = TrackStatus::of(outcome);
        match status {
            TrackStatus::Downloaded => counts.downloaded += 1,
            TrackStatus::Skipped => counts.skipped += 1,
            TrackStatus::Failed => counts.failed += 1,
        }
        let sequence = counts.completed();
        let reason = outcome.as_ref().err().map(|f| f.reason);

        reporter.print(ProgressLine {
            sequence,
            total: self.total,
            status,
            track,
            reason: reason.map(|r| r.label()),
        });
        reporter.emit(Event::TrackFinished {
            sequence,
            total: self.total,
            track: track.raw.clone(),
            status,
            reason,
        });

        match outcome {
            Ok(_) => tracing::debug!(track = %track.raw, sequence, ?status, "track finished"),
            Err(failure) => tracing::error!(
                track = %track.raw,
                sequence,
                reason = ?failure.reason,
                message = %failure.message,
                "track failed"
            ),
        }

        sequence
    }

    /// Current counts
    pub fn snapshot(&self) -> Counts {
        *self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
