//! External acquisition tool adapter
//!
//! The actual search, transfer and transcoding is delegated to an external
//! command-line tool (yt-dlp). This module owns everything about talking to it:
//!
//! - [`resolve`] - finding the tool, directly or through an interpreter
//! - [`milestones`] - once-per-attempt detection of progress markers in its output
//! - [`ytdlp`] - the production adapter that builds the command line, runs the
//!   subprocess and drains both output streams
//!
//! The adapter never decides whether an attempt succeeded. It hands back a
//! [`ToolTranscript`] and the download unit inspects the filesystem.

pub mod milestones;
pub mod resolve;
mod ytdlp;

pub use milestones::MilestoneTracker;
pub use resolve::ToolCommand;
pub use ytdlp::YtDlpTool;

use crate::config::AudioConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Exit status of an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command exited successfully (exit code 0)
    Success,
    /// The command exited unsuccessfully; `code` is None when killed by a signal
    Failure {
        /// Exit code, if any
        code: Option<i32>,
    },
}

impl ExitStatus {
    /// Returns `true` if the exit status represents success
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if status.success() {
            Self::Success
        } else {
            Self::Failure {
                code: status.code(),
            }
        }
    }
}

/// Everything the tool needs to fetch one track
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Free-text catalog search ("artist title")
    pub query: String,
    /// Output path template; must end in the temp suffix
    pub output_template: PathBuf,
    /// Proxy URL, if any
    pub proxy: Option<String>,
    /// Codec and quality preferences
    pub audio: AudioConfig,
}

impl FetchRequest {
    /// Command-line arguments for one fetch, search directive last
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--extract-audio".into(),
            "--audio-format".into(),
            self.audio.codec.clone().into(),
            "--audio-quality".into(),
            self.audio.quality.clone().into(),
        ];

        if self.audio.prefer_ffmpeg {
            args.push("--prefer-ffmpeg".into());
        }

        args.extend([
            OsString::from("--output"),
            self.output_template.clone().into_os_string(),
            "--no-playlist".into(),
            "--max-downloads".into(),
            "1".into(),
            "--ignore-errors".into(),
        ]);

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".into());
            args.push(OsString::from(proxy));
        }

        args.push(format!("ytsearch1:{}", self.query).into());
        args
    }
}

/// Captured output of one tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolTranscript {
    /// How the process exited
    pub status: ExitStatus,
    /// Full standard output
    pub stdout: String,
    /// Full standard error
    pub stderr: String,
}

/// An external program able to find and fetch audio for a search query
///
/// Implementations must drain all process output before returning and must
/// honour `cancel` by terminating the subprocess.
#[async_trait]
pub trait AcquisitionTool: Send + Sync {
    /// Verify the tool can be invoked (run once before any download)
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`](crate::Error::ToolNotFound) if it cannot.
    async fn check_available(&self) -> Result<()>;

    /// Run the tool for one request
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`](crate::Error::ExternalTool) if the process
    /// could not be started or waited on, and [`Error::Cancelled`](crate::Error::Cancelled)
    /// if `cancel` fired first. A non-zero exit is *not* an error.
    async fn fetch(
        &self,
        request: &FetchRequest,
        milestones: &MilestoneTracker,
        cancel: &CancellationToken,
    ) -> Result<ToolTranscript>;

    /// Human-readable tool name
    fn name(&self) -> &'static str;
}
