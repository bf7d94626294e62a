//! Queue processor: fills the job queue and runs the worker pool to completion.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};

use crate::error::{Error, Result};
use crate::progress::{Reporter, RunCounters};
use crate::types::{Event, RunSummary, Track};

use super::Downloader;
use super::failure_log::FailureLog;
use super::track_task::{NameLocks, TrackContext};

type JobQueue = Arc<Mutex<mpsc::Receiver<Track>>>;

impl Downloader {
    /// Download every track into `output_dir`
    ///
    /// Preconditions are checked before any track is touched: the configuration
    /// is validated, the tool is resolved, the output directory is created and
    /// the failure log is opened. Then `worker_count` workers pull tracks from a
    /// queue filled up front, each running the retry policy per track and
    /// recording exactly one terminal outcome. Failed tracks are streamed to the
    /// failure log as they happen.
    ///
    /// Returns only after every worker has finished and the failure log has
    /// been flushed and closed.
    ///
    /// # Errors
    ///
    /// Returns a precondition error ([`Error::Config`], [`Error::ToolNotFound`],
    /// [`Error::OutputDir`], [`Error::FailureLog`]) before processing starts.
    /// Per-track failures are not errors; they are counted in the summary.
    pub async fn run(&self, tracks: Vec<Track>, output_dir: impl AsRef<Path>) -> Result<RunSummary> {
        let output_dir = output_dir.as_ref();
        let started_at = Utc::now();

        self.config.validate()?;
        self.prepare(output_dir).await?;
        let failure_log = FailureLog::open(&self.config.failed_tracks_path).await?;

        let total = tracks.len();
        let workers = self.config.worker_count;
        let reporter = Reporter::new(self.event_tx.clone(), self.config.print_progress);

        tracing::info!(
            total,
            workers,
            ?output_dir,
            failure_log = ?failure_log.path(),
            tool = self.tool.name(),
            "starting run"
        );
        reporter.emit(Event::RunStarted { total, workers });

        // Capacity equals the track count, so filling the queue never waits
        let (job_tx, job_rx) = mpsc::channel(total.max(1));
        for track in tracks {
            job_tx
                .send(track)
                .await
                .map_err(|_| Error::Other("job queue closed while filling".to_string()))?;
        }
        drop(job_tx);
        let job_queue: JobQueue = Arc::new(Mutex::new(job_rx));

        let counters = Arc::new(RunCounters::new(total));
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(failure_log.run(failure_rx, reporter.clone()));

        let ctx = TrackContext {
            config: Arc::clone(&self.config),
            tool: Arc::clone(&self.tool),
            reporter: reporter.clone(),
            output_dir: Arc::new(PathBuf::from(output_dir)),
            cancel: self.cancel_token.clone(),
            name_locks: Arc::new(NameLocks::default()),
        };

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    ctx.clone(),
                    Arc::clone(&job_queue),
                    Arc::clone(&counters),
                    failure_tx.clone(),
                ))
            })
            .collect();
        drop(failure_tx);

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "worker task panicked");
            }
        }

        // All senders are gone once the workers finish, which ends the writer
        let failures_persisted = writer
            .await
            .map_err(|e| Error::Other(format!("failure log writer panicked: {e}")))?;

        let counts = counters.snapshot();
        let summary = RunSummary {
            total: counters.total(),
            downloaded: counts.downloaded,
            skipped: counts.skipped,
            failed: counts.failed,
            failures_persisted,
            cancelled: self.cancel_token.is_cancelled(),
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            total,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            failures_persisted,
            cancelled = summary.cancelled,
            "run complete"
        );
        reporter.print(format_args!("\n{summary}"));
        reporter.emit(Event::RunComplete {
            summary: summary.clone(),
        });

        Ok(summary)
    }
}

/// Worker loop: take the next track until the queue is drained or the run is cancelled
async fn run_worker(
    worker_id: usize,
    ctx: TrackContext,
    job_queue: JobQueue,
    counters: Arc<RunCounters>,
    failure_tx: mpsc::UnboundedSender<Track>,
) {
    let mut processed = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            track = async { job_queue.lock().await.recv().await } => track,
        };
        let Some(track) = next else {
            break;
        };

        let outcome = ctx.process_track(&track).await;
        counters.record(&track, &outcome, &ctx.reporter);
        processed += 1;

        if outcome.is_err() && failure_tx.send(track).is_err() {
            tracing::error!("failure log writer stopped before the run finished");
        }
    }

    tracing::debug!(worker_id, processed, "worker finished");
}
