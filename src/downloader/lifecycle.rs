//! Run preparation and shutdown coordination.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::utils::cleanup_temp_files;

use super::Downloader;

impl Downloader {
    /// Check every precondition of a run and ready the output directory
    ///
    /// 1. Verifies the acquisition tool can be invoked
    /// 2. Creates the output directory (and parents) if missing
    /// 3. Removes unfinished downloads left by an earlier run, if enabled
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] if the tool cannot be resolved and
    /// [`Error::OutputDir`] if the directory cannot be created.
    pub(crate) async fn prepare(&self, output_dir: &Path) -> Result<()> {
        self.tool.check_available().await?;

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| Error::OutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;

        if self.config.cleanup_temp_on_start {
            match cleanup_temp_files(output_dir).await {
                Ok(0) => tracing::debug!(?output_dir, "no incomplete downloads to clean up"),
                Ok(removed) => tracing::info!(?output_dir, removed, "startup temp cleanup finished"),
                Err(e) => {
                    tracing::warn!(?output_dir, error = %e, "could not scan output directory for temp files");
                }
            }
        }

        Ok(())
    }

    /// Cancel the running (and any later) run
    ///
    /// Workers stop taking new tracks, in-flight tool processes are killed and
    /// backoff sleeps end early. Tracks interrupted mid-attempt are recorded as
    /// failures; tracks still queued are left untouched. [`run`](Downloader::run)
    /// returns once the failure log is flushed.
    pub fn shutdown(&self) {
        if !self.cancel_token.is_cancelled() {
            tracing::info!("Initiating shutdown");
        }
        self.cancel_token.cancel();
    }

    /// Whether [`shutdown`](Downloader::shutdown) has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Token cancelled on shutdown, for tying external work to the downloader
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}
