//! Runtime configuration for the arbiter.
//!
//! Every value has a compile-time default and can be overridden through a dedicated environment
//! variable. Command-line flags in the binary take precedence over both.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bot host address.
const DEFAULT_BOT_ADDR: &str = "127.0.0.1:7878";

/// Default time budget for auto-play searches (in milliseconds).
const DEFAULT_MOVETIME_MS: u64 = 1000;

/// Default bound on each acknowledgement wait during session start-up (in milliseconds).
const DEFAULT_READY_TIMEOUT_MS: u64 = 5000;

/// Default directory for the CLI's log files.
const DEFAULT_LOG_DIR: &str = "logs";

/// Get the bot host address.
///
/// Priority:
/// 1. `ARBITER_BOT_ADDR` env variable if set
/// 2. `127.0.0.1:7878` as fallback
pub fn get_bot_addr() -> String {
    std::env::var("ARBITER_BOT_ADDR").unwrap_or_else(|_| DEFAULT_BOT_ADDR.to_string())
}

/// Get the auto-play search time in milliseconds.
///
/// Falls back to the default if `ARBITER_MOVETIME_MS` is unset or not a `u64`.
pub fn get_movetime_ms() -> u64 {
    parse_env("ARBITER_MOVETIME_MS").unwrap_or(DEFAULT_MOVETIME_MS)
}

/// Get the session start-up acknowledgement timeout.
///
/// Falls back to the default if `ARBITER_READY_TIMEOUT_MS` is unset or not a `u64`.
pub fn get_ready_timeout() -> Duration {
    Duration::from_millis(parse_env("ARBITER_READY_TIMEOUT_MS").unwrap_or(DEFAULT_READY_TIMEOUT_MS))
}

pub fn get_log_dir() -> PathBuf {
    std::env::var("ARBITER_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR))
}

fn parse_env(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbiterConfig {
    pub bot_addr: String,
    pub movetime_ms: u64,
    pub ready_timeout: Duration,
    pub log_dir: PathBuf,
}

impl ArbiterConfig {
    pub fn from_env() -> Self {
        Self {
            bot_addr: get_bot_addr(),
            movetime_ms: get_movetime_ms(),
            ready_timeout: get_ready_timeout(),
            log_dir: get_log_dir(),
        }
    }
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            bot_addr: DEFAULT_BOT_ADDR.to_string(),
            movetime_ms: DEFAULT_MOVETIME_MS,
            ready_timeout: Duration::from_millis(DEFAULT_READY_TIMEOUT_MS),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

/// Create the log directory if needed.
pub fn prepare_log_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}
