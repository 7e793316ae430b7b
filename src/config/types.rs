//! Configuration types.
//!
//! This module defines the library configuration struct and the enums shared
//! with command-line argument parsing.

use std::path::PathBuf;

use clap::ValueEnum;

use crate::config::constants::{
    DATA_DIR, DB_PATH, DEFAULT_INITIAL_WAIT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS,
    HTTP_TIMEOUT_SECS,
};

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration (no CLI dependencies).
///
/// This is the core configuration struct used by the library. It can be
/// constructed programmatically without any CLI dependencies.
///
/// # Examples
///
/// ```no_run
/// use domain_custody::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     file: PathBuf::from("domains.txt"),
///     verify_inline: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// File to read domains from (one per line, `#` comments allowed)
    pub file: PathBuf,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Database path (SQLite file) for tasks and ownership results
    pub db_path: PathBuf,

    /// Base directory for per-run artifacts
    pub data_dir: PathBuf,

    /// Case identifier; defaults to the generated run id
    pub case_id: Option<String>,

    /// API key for the WHOIS API fallback of the registry source
    pub whois_api_key: Option<String>,

    /// Per-request timeout for registry/scrape HTTP calls, in seconds
    pub timeout_seconds: u64,

    /// Maximum verification poll attempts per minted TXT task
    pub max_attempts: u32,

    /// Interval between verification poll attempts, in seconds
    pub poll_interval_secs: u64,

    /// Grace period before a task's first DNS check, in seconds
    pub initial_wait_secs: u64,

    /// Drain this case's TXT verification tasks inline after the pipeline run
    pub verify_inline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: PathBuf::from("domains.txt"),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            data_dir: PathBuf::from(DATA_DIR),
            case_id: None,
            whois_api_key: None,
            timeout_seconds: HTTP_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            initial_wait_secs: DEFAULT_INITIAL_WAIT_SECS,
            verify_inline: false,
        }
    }
}
