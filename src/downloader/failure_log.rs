//! Failure stream writer: appends failed playlist lines to the failure log as they happen.
//!
//! The file is opened once per run in append mode. Every line is flushed and
//! synced before the next one is accepted, so a process killed mid-run leaves a
//! complete, directly replayable list of the failures seen so far.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::progress::Reporter;
use crate::types::{Event, Track};

/// Append-only failure log
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    file: File,
}

impl FailureLog {
    /// Open (creating if needed) the failure log for appending
    ///
    /// # Errors
    ///
    /// Returns [`Error::FailureLog`] if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| Error::FailureLog {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(?path, "opened failure log");
        Ok(Self { path, file })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one raw playlist line and push it to stable storage
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if writing or syncing fails.
    pub async fn append(&mut self, raw: &str) -> Result<()> {
        let mut line = String::with_capacity(raw.len() + 1);
        line.push_str(raw);
        line.push('\n');

        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await?;
        self.file.sync_data().await?;
        Ok(())
    }

    /// Drain `rx` until every sender is dropped, appending each track
    ///
    /// A failed write is logged and does not stop the writer. Returns the number
    /// of lines durably written.
    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Track>, reporter: Reporter) -> usize {
        let mut persisted = 0;

        while let Some(track) = rx.recv().await {
            match self.append(&track.raw).await {
                Ok(()) => {
                    persisted += 1;
                    tracing::debug!(track = %track.raw, path = ?self.path, "failure persisted");
                    reporter.emit(Event::FailurePersisted { track: track.raw });
                }
                Err(e) => {
                    tracing::error!(
                        track = %track.raw,
                        path = ?self.path,
                        error = %e,
                        "failed to write to failure log"
                    );
                }
            }
        }

        tracing::debug!(persisted, path = ?self.path, "failure log closed");
        persisted
    }
}
