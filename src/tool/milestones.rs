//! Progress milestones in tool output
//!
//! Two markers are surfaced to the user per attempt, each at most once, no matter
//! which output stream carries the matching line first:
//! - *found*: the catalog search produced a hit
//! - *transferring*: media transfer started

use crate::progress::Reporter;
use crate::types::Event;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether a tool output line indicates a catalog hit
pub fn is_found_line(line: &str) -> bool {
    line.contains("Downloading")
        || line.contains("Extracting")
        || line.contains("[youtube]")
        || line.contains("has already been downloaded")
}

/// Whether a tool output line indicates the media transfer started
pub fn is_transfer_line(line: &str) -> bool {
    line.contains("Downloading") && !line.contains("Downloading webpage")
}

/// Once-per-attempt milestone detector shared by both stream drains
#[derive(Debug)]
pub struct MilestoneTracker {
    query: String,
    found: AtomicBool,
    transferring: AtomicBool,
    reporter: Reporter,
}

impl MilestoneTracker {
    /// Fresh tracker for one attempt
    pub fn new(query: impl Into<String>, reporter: Reporter) -> Self {
        Self {
            query: query.into(),
            found: AtomicBool::new(false),
            transferring: AtomicBool::new(false),
            reporter,
        }
    }

    /// Inspect one output line, announcing any milestone seen for the first time
    pub fn observe_line(&self, line: &str) {
        if is_found_line(line) && !self.found.swap(true, Ordering::AcqRel) {
            self.reporter.print(format_args!("Found: {}", self.query));
            self.reporter.emit(Event::Found {
                query: self.query.clone(),
            });
        }

        if is_transfer_line(line) && !self.transferring.swap(true, Ordering::AcqRel) {
            self.reporter.print(format_args!("Downloading: {}", self.query));
            self.reporter.emit(Event::Transferring {
                query: self.query.clone(),
            });
        }
    }

    /// Whether a catalog hit was announced
    pub fn found(&self) -> bool {
        self.found.load(Ordering::Acquire)
    }

    /// Whether a transfer was announced
    pub fn transferring(&self) -> bool {
        self.transferring.load(Ordering::Acquire)
    }
}
