//! Shared test helpers: a scripted acquisition tool and downloader builders.

use crate::config::{Config, RetryConfig};
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::tool::{AcquisitionTool, ExitStatus, FetchRequest, MilestoneTracker, ToolTranscript};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// What the scripted tool does for one invocation
#[derive(Clone, Debug)]
pub(crate) enum Step {
    /// Write the temp file for `ext` (no dot) and exit successfully
    Produce(&'static str),
    /// Exit with code 1 and the given stderr, writing nothing
    Fail(&'static str),
    /// Block until cancelled
    Hang,
    /// Report that the process could not be started
    SpawnError,
}

/// In-process stand-in for the external tool
pub(crate) struct ScriptedTool {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Step,
    latency: Duration,
    available: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTool {
    /// Tool that runs `fallback` for every query without a script
    pub(crate) fn new(fallback: Step) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            latency: Duration::ZERO,
            available: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Run `steps` in order for `query`, then the fallback
    pub(crate) fn script(self, query: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(query.to_string(), steps.into_iter().collect());
        self
    }

    /// Sleep this long before each step
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make `check_available` fail
    pub(crate) fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Queries seen so far, in call order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of invocations for one query
    pub(crate) fn calls_for(&self, query: &str) -> usize {
        self.calls().iter().filter(|q| q.as_str() == query).count()
    }

    fn next_step(&self, query: &str) -> Step {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(query)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Path the tool would write for `ext`, derived from the output template
pub(crate) fn rendered_path(template: &Path, ext: &str) -> PathBuf {
    PathBuf::from(template.to_string_lossy().replace("%(ext)s", ext))
}

#[async_trait::async_trait]
impl AcquisitionTool for ScriptedTool {
    async fn check_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(Error::ToolNotFound("scripted tool disabled".to_string()))
        }
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        milestones: &MilestoneTracker,
        cancel: &CancellationToken,
    ) -> Result<ToolTranscript> {
        self.calls.lock().unwrap().push(request.query.clone());
        let step = self.next_step(&request.query);

        if !self.latency.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.latency) => {}
                _ = cancel.cancelled() => return Err(Error::Cancelled),
            }
        }

        match step {
            Step::Produce(ext) => {
                milestones.observe_line("[youtube] Extracting URL: ytsearch1");
                milestones.observe_line("[download] Downloading item 1 of 1");
                std::fs::write(rendered_path(&request.output_template, ext), b"audio").unwrap();
                Ok(ToolTranscript {
                    status: ExitStatus::Success,
                    stdout: "[download] 100%".to_string(),
                    stderr: String::new(),
                })
            }
            Step::Fail(stderr) => Ok(ToolTranscript {
                status: ExitStatus::Failure { code: Some(1) },
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
            Step::Hang => {
                cancel.cancelled().await;
                Err(Error::Cancelled)
            }
            Step::SpawnError => Err(Error::ExternalTool(
                "Failed to start command: No such file or directory".to_string(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config for tests: no printing, fast retries, failure log inside `dir`
pub(crate) fn test_config(dir: &TempDir, worker_count: usize) -> Config {
    Config {
        worker_count,
        retry: RetryConfig {
            base_delay: Duration::from_millis(5),
            ..RetryConfig::default()
        },
        failed_tracks_path: dir.path().join("failed.txt"),
        print_progress: false,
        ..Config::default()
    }
}

/// Downloader driven by `tool`, writing into a fresh temp directory
///
/// Returns the downloader, the tool handle and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    tool: ScriptedTool,
    worker_count: usize,
) -> (Downloader, Arc<ScriptedTool>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let tool = Arc::new(tool);
    let downloader = Downloader::with_config(test_config(&temp_dir, worker_count))
        .unwrap()
        .with_tool(tool.clone());
    (downloader, tool, temp_dir)
}

/// Where the test downloader writes audio
pub(crate) fn music_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("music")
}
