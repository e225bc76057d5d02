//! Runtime configuration for the pipeline binary.

use std::path::PathBuf;
use std::time::Duration;

use loadgate_account::domain::aggregates::AccountLimits;

/// Default chrono format for request times: RFC-3339 UTC with a literal
/// `Z` suffix.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Runtime configuration. Limits of zero disable that axis.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// File the reader consumes request lines from.
    pub input_path: PathBuf,
    /// File the writer flushes the report to.
    pub output_path: PathBuf,
    /// Per-customer deposit limits.
    pub limits: AccountLimits,
    /// Format for request times without an explicit `time_format`.
    pub default_time_format: String,
    /// Quiescence window between the shutdown trigger and component
    /// teardown, giving in-flight events time to flush.
    pub post_read_wait: Duration,
    /// How long the process manager waits for `DataWritten` after
    /// requesting the report.
    pub report_written_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("input.txt"),
            output_path: PathBuf::from("output.txt"),
            limits: AccountLimits {
                daily_amount: 5000.0,
                daily_count: 3,
                weekly_amount: 20000.0,
                weekly_count: 0,
            },
            default_time_format: DEFAULT_TIME_FORMAT.to_owned(),
            post_read_wait: Duration::from_secs(10),
            report_written_timeout: Duration::from_secs(3),
        }
    }
}

impl AppConfig {
    /// Returns the default configuration with `INPUT_FILE` /
    /// `OUTPUT_FILE` environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("INPUT_FILE") {
            config.input_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("OUTPUT_FILE") {
            config.output_path = PathBuf::from(path);
        }
        config
    }
}
