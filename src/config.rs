//! Per-job coordination configuration

use std::time::Duration;

use crate::DEFAULT_POLL_INTERVAL_MS;

/// Configuration for one job's coordination layer
#[derive(Debug, Clone)]
pub struct JobCoordinationConfig {
    /// Job identifier, also the root of the job's store subtree
    pub job_name: String,
    /// Total number of shards to partition across servers
    pub total_shards: u32,
    /// Whether this worker participates enabled (false registers it disabled)
    pub enabled: bool,
    /// When true, resharding waits until no shard of the old assignment
    /// is still executing
    pub monitor_execution: bool,
    /// Sleep interval for the follower-wait and execution-wait loops
    pub poll_interval: Duration,
}

impl Default for JobCoordinationConfig {
    fn default() -> Self {
        Self {
            job_name: "default-job".into(),
            total_shards: 1,
            enabled: true,
            monitor_execution: true,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}
