//! Core downloader implementation split into focused submodules.
//!
//! The `Downloader` struct and its methods are organized by domain:
//! - [`lifecycle`] - Run preparation and shutdown coordination
//! - [`queue_processor`] - Worker pool and run orchestration
//! - [`track_task`] - Per-track download unit wrapped in the retry policy
//! - [`failure_log`] - Streaming, durable failure persistence

mod failure_log;
mod lifecycle;
mod queue_processor;
mod track_task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use failure_log::FailureLog;

use crate::config::Config;
use crate::error::Result;
use crate::tool::{AcquisitionTool, YtDlpTool};
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Clones share the event channel and the cancellation token, so a clone can be
/// used to [`shutdown`](Downloader::shutdown) a run started from another.
#[derive(Clone)]
pub struct Downloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Acquisition tool (trait object for pluggable implementations)
    pub(crate) tool: Arc<dyn AcquisitionTool>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Cancels the current and any later run
    pub(crate) cancel_token: CancellationToken,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .field("tool", &self.tool.name())
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}

impl Downloader {
    /// Create a downloader with default settings and `worker_count` workers
    ///
    /// A `worker_count` of zero is rejected when the run starts.
    pub fn new(worker_count: usize) -> Self {
        let config = Config {
            worker_count,
            ..Config::default()
        };
        Self::build(config)
    }

    /// Create a downloader from a full configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is invalid.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: Config) -> Self {
        let tool: Arc<dyn AcquisitionTool> = Arc::new(YtDlpTool::new(config.tool.clone()));
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config: Arc::new(config),
            tool,
            event_tx,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Replace the acquisition tool
    pub fn with_tool(mut self, tool: Arc<dyn AcquisitionTool>) -> Self {
        self.tool = tool;
        self
    }

    /// Set the proxy used for every download; an empty string disables it
    ///
    /// Affects runs started after the call. The URL is validated when a run starts.
    pub fn set_proxy(&mut self, proxy_url: impl Into<String>) {
        let proxy_url = proxy_url.into();
        let config = Arc::make_mut(&mut self.config);
        config.proxy_url = if proxy_url.is_empty() {
            None
        } else {
            Some(proxy_url)
        };
    }

    /// Subscribe to downloader events
    ///
    /// Each subscriber receives every event sent after it subscribed. Slow
    /// subscribers lag and lose the oldest events rather than blocking workers.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
