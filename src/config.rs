//! Configuration types for playlist-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for [`Downloader`](crate::Downloader)
///
/// Built once before a run and shared read-only between the worker pool, the
/// per-track download unit and the acquisition tool adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Number of concurrent workers (default: 4)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Retry policy applied to every track
    #[serde(default)]
    pub retry: RetryConfig,

    /// Skip tracks whose final audio file already exists (default: true)
    #[serde(default = "default_true")]
    pub skip_existing: bool,

    /// Proxy URL handed to the acquisition tool (None = direct connection)
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Audio extraction settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Acquisition tool discovery
    #[serde(default)]
    pub tool: ToolConfig,

    /// File that failed playlist lines are appended to (default: "playlist-failed.txt")
    #[serde(default = "default_failed_tracks_path")]
    pub failed_tracks_path: PathBuf,

    /// Print user-facing progress lines to stdout (default: true)
    #[serde(default = "default_true")]
    pub print_progress: bool,

    /// Remove leftover `*.tmp` files from the output directory before a run (default: true)
    #[serde(default = "default_true")]
    pub cleanup_temp_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            retry: RetryConfig::default(),
            skip_existing: true,
            proxy_url: None,
            audio: AudioConfig::default(),
            tool: ToolConfig::default(),
            failed_tracks_path: default_failed_tracks_path(),
            print_progress: true,
            cleanup_temp_on_start: true,
        }
    }
}

impl Config {
    /// Check the configuration for values the downloader cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::config("worker_count", "must be at least 1"));
        }

        if self.audio.codec.trim().is_empty() {
            return Err(Error::config("audio.codec", "must not be empty"));
        }

        if self.retry.backoff.multiplier().is_some_and(|m| m < 1.0) {
            return Err(Error::config(
                "retry.backoff.multiplier",
                "exponential multiplier must be >= 1.0",
            ));
        }

        if let Some(proxy) = self.proxy() {
            let parsed = url::Url::parse(proxy).map_err(|e| {
                Error::config("proxy_url", format!("invalid proxy URL {proxy:?}: {e}"))
            })?;
            if !matches!(
                parsed.scheme(),
                "http" | "https" | "socks4" | "socks4a" | "socks5" | "socks5h"
            ) {
                return Err(Error::config(
                    "proxy_url",
                    format!("unsupported proxy scheme {:?}", parsed.scheme()),
                ));
            }
        }

        Ok(())
    }

    /// The configured proxy, treating an empty string as "no proxy"
    pub fn proxy(&self) -> Option<&str> {
        self.proxy_url
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Parse and validate a JSON configuration; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] for malformed JSON and [`Error::Config`]
    /// if the parsed values fail [`validate`](Config::validate).
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Retry configuration for failed track attempts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Number of retries after the first attempt (default: 2, so 3 attempts total)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base unit of the inter-attempt delay (default: 1 second)
    #[serde(default = "default_base_delay", with = "duration_serde")]
    pub base_delay: Duration,

    /// How the delay grows between attempts (default: linear)
    #[serde(default)]
    pub backoff: Backoff,

    /// Upper bound for a single delay (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            backoff: Backoff::default(),
            max_delay: default_max_delay(),
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Total number of attempts per track
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after the `failed_attempts`-th failure (1-based), before jitter
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let n = failed_attempts.max(1);
        let delay = match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(n),
            Backoff::Exponential { multiplier } => {
                let factor = multiplier.powi(i32::try_from(n - 1).unwrap_or(i32::MAX));
                Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
                    .unwrap_or(self.max_delay)
            }
        };
        delay.min(self.max_delay)
    }
}

/// Growth of the delay between attempts
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Backoff {
    /// `base_delay * n` after the n-th failure
    #[default]
    Linear,
    /// `base_delay * multiplier^(n-1)` after the n-th failure
    Exponential {
        /// Growth factor per attempt
        multiplier: f64,
    },
}

impl Backoff {
    fn multiplier(&self) -> Option<f64> {
        match self {
            Backoff::Linear => None,
            Backoff::Exponential { multiplier } => Some(*multiplier),
        }
    }
}

/// Audio extraction settings passed to the acquisition tool
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Preferred output codec (default: "mp3")
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Quality target (default: "192K")
    #[serde(default = "default_quality")]
    pub quality: String,

    /// Ask the tool to transcode through ffmpeg when it is available (default: true)
    #[serde(default = "default_true")]
    pub prefer_ffmpeg: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            quality: default_quality(),
            prefer_ffmpeg: true,
        }
    }
}

/// Acquisition tool discovery
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Explicit path to the tool binary (auto-detected if None)
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Program name for direct invocation (default: "yt-dlp")
    #[serde(default = "default_program")]
    pub program: String,

    /// Interpreters tried for the module-execution fallback, in order
    #[serde(default = "default_interpreters")]
    pub interpreters: Vec<String>,

    /// Module name for the `-m` fallback (default: "yt_dlp")
    #[serde(default = "default_module")]
    pub module: String,

    /// Whether to search PATH for the program if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            program: default_program(),
            interpreters: default_interpreters(),
            module: default_module(),
            search_path: true,
        }
    }
}

// Default value functions
fn default_worker_count() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_failed_tracks_path() -> PathBuf {
    PathBuf::from("playlist-failed.txt")
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_codec() -> String {
    "mp3".to_string()
}

fn default_quality() -> String {
    "192K".to_string()
}

fn default_program() -> String {
    "yt-dlp".to_string()
}

fn default_interpreters() -> Vec<String> {
    vec!["python".to_string(), "python3".to_string()]
}

fn default_module() -> String {
    "yt_dlp".to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.max_attempts(), 3);
        assert_eq!(config.retry.base_delay, Duration::from_secs(1));
        assert_eq!(config.retry.backoff, Backoff::Linear);
        assert!(config.skip_existing);
        assert!(config.proxy_url.is_none());
        assert_eq!(config.audio.codec, "mp3");
        assert_eq!(config.audio.quality, "192K");
        assert_eq!(config.tool.program, "yt-dlp");
        assert_eq!(config.tool.module, "yt_dlp");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize failed");
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.retry.max_attempts(), 3);
        assert_eq!(
            config.failed_tracks_path,
            PathBuf::from("playlist-failed.txt")
        );
        assert!(config.print_progress);
    }

    #[test]
    fn from_json_validates() {
        let config = Config::from_json(r#"{"worker_count": 8, "proxy_url": ""}"#).unwrap();
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.proxy(), None);

        let err = Config::from_json(r#"{"worker_count": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn retry_config_round_trips_through_json() {
        let retry = RetryConfig {
            max_retries: 4,
            base_delay: Duration::from_secs(2),
            backoff: Backoff::Exponential { multiplier: 3.0 },
            max_delay: Duration::from_secs(30),
            jitter: true,
        };

        let json = serde_json::to_string(&retry).expect("serialize failed");
        assert!(json.contains(r#""kind":"exponential""#), "got: {json}");
        let back: RetryConfig = serde_json::from_str(&json).expect("deserialize failed");

        assert_eq!(back.max_retries, 4);
        assert_eq!(back.base_delay, Duration::from_secs(2));
        assert_eq!(back.backoff, Backoff::Exponential { multiplier: 3.0 });
        assert_eq!(back.max_delay, Duration::from_secs(30));
        assert!(back.jitter);
    }

    #[test]
    fn linear_delay_grows_with_attempt_index() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(1), Duration::from_secs(1));
        assert_eq!(retry.delay_for(2), Duration::from_secs(2));
        assert_eq!(retry.delay_for(3), Duration::from_secs(3));
    }

    #[test]
    fn exponential_delay_is_capped() {
        let retry = RetryConfig {
            base_delay: Duration::from_secs(1),
            backoff: Backoff::Exponential { multiplier: 2.0 },
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(retry.delay_for(1), Duration::from_secs(1));
        assert_eq!(retry.delay_for(2), Duration::from_secs(2));
        assert_eq!(retry.delay_for(3), Duration::from_secs(4));
        assert_eq!(retry.delay_for(4), Duration::from_secs(5), "must respect max_delay");
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = Config {
            worker_count: 0,
            ..Default::default()
        };
        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("worker_count")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_malformed_proxy() {
        let config = Config {
            proxy_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            proxy_url: Some("ftp://localhost:21".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err(), "ftp is not a proxy scheme");
    }

    #[test]
    fn empty_proxy_string_means_direct_connection() {
        let config = Config {
            proxy_url: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(config.proxy().is_none());
        assert!(config.validate().is_ok());

        let config = Config {
            proxy_url: Some("http://localhost:8881".to_string()),
            ..Default::default()
        };
        assert_eq!(config.proxy(), Some("http://localhost:8881"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn duration_serde_rejects_negative_integer() {
        let json = r#"{"base_delay": -1, "max_delay": 60}"#;
        let result = serde_json::from_str::<RetryConfig>(json);
        assert!(
            result.is_err(),
            "-1 for a Duration (u64) field must produce a serde error"
        );
    }
}
