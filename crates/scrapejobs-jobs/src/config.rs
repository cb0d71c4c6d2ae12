//! Runner configuration.

use std::time::Duration;

/// Job runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Wait between polls when no job is pending.
    pub poll_interval: Duration,
    /// Capacity of the result channel between handler and CSV writer.
    pub channel_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            channel_capacity: 64,
        }
    }
}
