//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::loader::ConfigLoader;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub runner: RunnerSettings,
}

/// Job database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file, `~` is expanded.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// How long SQLite waits on a lock before reporting busy (0 = report immediately).
    #[serde(default)]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    /// Database path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(ConfigLoader::expand_path(&self.path))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: 0,
        }
    }
}

fn default_store_path() -> String {
    "~/.scrapejobs/jobs.db".to_string()
}

/// Busy-store retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl RetrySettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_attempts: default_max_attempts(),
            jitter: true,
        }
    }
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Folder holding one `<job id>.csv` per job, `~` is expanded.
    #[serde(default = "default_data_folder")]
    pub data_folder: String,
}

impl ExportConfig {
    /// Data folder with `~` expanded.
    pub fn resolved_data_folder(&self) -> PathBuf {
        PathBuf::from(ConfigLoader::expand_path(&self.data_folder))
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            data_folder: default_data_folder(),
        }
    }
}

fn default_data_folder() -> String {
    "~/.scrapejobs/data".to_string()
}

/// Job runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl RunnerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retry.initial_backoff(), Duration::from_millis(100));
        assert_eq!(config.retry.max_backoff(), Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 10);
        assert!(config.retry.jitter);
        assert_eq!(config.store.busy_timeout(), Duration::ZERO);
        assert_eq!(config.runner.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_resolved_paths_expand_tilde() {
        let config = Config::default();
        assert!(!config.store.resolved_path().starts_with("~"));
        assert!(config.store.resolved_path().ends_with(".scrapejobs/jobs.db"));
        assert!(config.export.resolved_data_folder().ends_with(".scrapejobs/data"));
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: Config = toml::from_str("[retry]\nmax_attempts = 3\n").unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_ms, 100);
        assert!(config.retry.jitter);
    }
}
