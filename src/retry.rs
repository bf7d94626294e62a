//! Retry logic with linear (or exponential) backoff
//!
//! A track is attempted up to `max_retries + 1` times. Between failed attempts the
//! task sleeps for [`RetryConfig::delay_for`] the number of failures so far; no
//! sleep follows the final attempt. The sleep is interrupted by cancellation.
//!
//! # Example
//!
//! ```no_run
//! use playlist_dl::retry::{IsRetryable, download_with_retry};
//! use playlist_dl::config::RetryConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let cancel = CancellationToken::new();
//! download_with_retry(&config, &cancel, |_attempt| async {
//!     Ok::<_, MyError>(())
//! }, |_, _, _| {}).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::types::TrackFailure;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the operation should be attempted again
    fn is_retryable(&self) -> bool;
}

/// Every classified track failure is worth another attempt; cancellation is not
impl IsRetryable for TrackFailure {
    fn is_retryable(&self) -> bool {
        !self.is_cancelled()
    }
}

/// Execute an async operation, retrying failed attempts with backoff
///
/// `operation` receives the 1-based attempt number. `on_retry` is called with the
/// failed attempt number, its error and the delay before the next attempt, right
/// before sleeping.
///
/// Returns the first success, or the error of the last attempt made. If `cancel`
/// fires during a backoff sleep, the error of the attempt that just failed is
/// returned without further attempts.
pub async fn download_with_retry<F, Fut, T, E, R>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
    mut on_retry: R,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
    R: FnMut(u32, &E, Duration),
{
    let max_attempts = config.max_attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = config.delay_for(attempt);
                let delay = if config.jitter { add_jitter(delay) } else { delay };

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis(),
                    "Attempt failed, retrying"
                );
                on_retry(attempt, &e, delay);

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        tracing::debug!(attempt, "Backoff interrupted by cancellation");
                        return Err(e);
                    }
                }

                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::debug!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
