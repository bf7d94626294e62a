//! yt-dlp adapter

use super::resolve::{ToolCommand, resolve};
use super::{AcquisitionTool, ExitStatus, FetchRequest, MilestoneTracker, ToolTranscript};
use crate::config::ToolConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// Acquisition tool backed by the `yt-dlp` command-line program
///
/// Resolution runs lazily on first use and is cached once it succeeds. A failed
/// resolution is retried the next time a command is built.
///
/// # Examples
///
/// ```no_run
/// use playlist_dl::config::ToolConfig;
/// use playlist_dl::tool::{AcquisitionTool, YtDlpTool};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tool = YtDlpTool::new(ToolConfig::default());
/// tool.check_available().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct YtDlpTool {
    config: ToolConfig,
    resolved: OnceCell<ToolCommand>,
}

impl YtDlpTool {
    /// Create an adapter; nothing is probed until first use
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config,
            resolved: OnceCell::new(),
        }
    }

    /// The resolved invocation, resolving it now if necessary
    ///
    /// A successful resolution is cached for the adapter's lifetime.
    pub async fn command(&self) -> Result<&ToolCommand> {
        self.resolved
            .get_or_try_init(|| resolve(&self.config))
            .await
    }
}

#[async_trait]
impl AcquisitionTool for YtDlpTool {
    async fn check_available(&self) -> Result<()> {
        self.command().await.map(|_| ())
    }

    /// Runs the invocation resolved on first use; it is not re-resolved if the
    /// tool disappears later, so such attempts fail with "Failed to start command".
    async fn fetch(
        &self,
        request: &FetchRequest,
        milestones: &MilestoneTracker,
        cancel: &CancellationToken,
    ) -> Result<ToolTranscript> {
        let tool = self.command().await?;

        let mut child = tool
            .command()
            .args(request.args())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::ExternalTool(format!("Failed to start command: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ExternalTool("Failed to create stdout pipe".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::ExternalTool("Failed to create stderr pipe".to_string()))?;

        tracing::debug!(tool = %tool, query = %request.query, "tool started");

        // Both pipes are drained for the whole life of the process; each drain owns
        // its buffer and the transcript is assembled only after all three finish.
        let (stdout, stderr, status) = tokio::join!(
            drain_lines(stdout, milestones, cancel),
            drain_lines(stderr, milestones, cancel),
            wait_or_kill(&mut child, cancel),
        );
        let status = status?;

        tracing::debug!(query = %request.query, ?status, "tool exited");

        Ok(ToolTranscript {
            status,
            stdout,
            stderr,
        })
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Read a stream to EOF line by line, feeding each line to the milestone tracker
///
/// Invalid UTF-8 is replaced rather than aborting the drain. Stops early on
/// cancellation, since grandchildren of a killed process may keep the pipe open.
async fn drain_lines<R>(reader: R, milestones: &MilestoneTracker, cancel: &CancellationToken) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut captured = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => read,
            _ = cancel.cancelled() => break,
        };
        match read {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                milestones.observe_line(line);
                captured.push_str(line);
                captured.push('\n');
            }
            Err(e) => {
                tracing::warn!(error = %e, "error reading tool output");
                break;
            }
        }
    }

    captured
}

/// Wait for the child to exit, killing it if `cancel` fires first
async fn wait_or_kill(child: &mut Child, cancel: &CancellationToken) -> Result<ExitStatus> {
    tokio::select! {
        status = child.wait() => status
            .map(ExitStatus::from)
            .map_err(|e| Error::ExternalTool(format!("Failed to wait for command: {e}"))),
        _ = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "failed to kill tool process");
            }
            Err(Error::Cancelled)
        }
    }
}
