//! Resharding coordinator
//!
//! Drives one resharding pass per scheduled fire: checks the pending flag,
//! gates the recomputation on leadership, and commits the new assignment
//! together with the flag deletions in one store transaction. Followers
//! only ever wait; they never write assignment state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::JobCoordinationConfig;
use crate::error::{CoordError, Result};
use crate::server::ServerDirectory;
use crate::sharding::strategy::ShardingStrategy;
use crate::store::paths::{self, SHARDING_NECESSARY, SHARDING_PROCESSING};
use crate::store::{CoordinationStore, TxOp};

/// External election result for this job
#[async_trait]
pub trait LeaderOracle: Send + Sync {
    /// Whether this process currently holds resharding rights
    async fn is_leader(&self) -> bool;
}

/// Tracks live shard executions for this job
#[async_trait]
pub trait ExecutionTracker: Send + Sync {
    /// Whether any shard of the current assignment is mid-execution
    async fn has_running_items(&self) -> bool;

    /// Drop the running markers for the given shards; used after a
    /// reconnect when local execution-lock state cannot be trusted
    async fn clear_running_marks(&self, items: &[u32]);
}

/// Leader-gated resharding for one job
pub struct ReshardingCoordinator {
    config: JobCoordinationConfig,
    store: Arc<dyn CoordinationStore>,
    directory: Arc<ServerDirectory>,
    leader: Arc<dyn LeaderOracle>,
    execution: Arc<dyn ExecutionTracker>,
    strategy: Arc<dyn ShardingStrategy>,
}

impl ReshardingCoordinator {
    pub fn new(
        config: JobCoordinationConfig,
        store: Arc<dyn CoordinationStore>,
        directory: Arc<ServerDirectory>,
        leader: Arc<dyn LeaderOracle>,
        execution: Arc<dyn ExecutionTracker>,
        strategy: Arc<dyn ShardingStrategy>,
    ) -> Self {
        Self {
            config,
            store,
            directory,
            leader,
            execution,
            strategy,
        }
    }

    /// Mark that the assignment must be recomputed; idempotent
    pub async fn set_resharding_flag(&self) -> Result<()> {
        self.store.create(SHARDING_NECESSARY, "").await
    }

    /// Whether a resharding pass is pending
    pub async fn is_resharding_needed(&self) -> Result<bool> {
        self.store.exists(SHARDING_NECESSARY).await
    }

    /// Run one resharding pass; called before each scheduled fire.
    ///
    /// With no shardable servers, clears every assignment and returns.
    /// Followers wait until the leader's commit clears both flags. The
    /// leader recomputes and commits assignment writes plus both flag
    /// deletions as one transaction, so followers never observe the flags
    /// gone without the new assignment. Any failure before the commit
    /// leaves the `necessary` flag set and the next pass retries.
    pub async fn reshard_if_necessary(&self) -> Result<()> {
        let shardable = self.directory.shardable_servers().await?;
        if shardable.is_empty() {
            self.clear_assignments().await?;
            return Ok(());
        }
        if !self.is_resharding_needed().await? {
            return Ok(());
        }
        if !self.leader.is_leader().await {
            self.wait_for_leader_commit().await?;
            return Ok(());
        }
        if self.config.monitor_execution {
            self.wait_for_running_items().await;
        }

        debug!("Job '{}' resharding begin", self.config.job_name);
        self.store.create_ephemeral(SHARDING_PROCESSING, "").await?;
        self.clear_assignments().await?;

        let assignment = self
            .strategy
            .allocate(&shardable, self.config.total_shards);
        let mut ops = Vec::with_capacity(assignment.len() + 2);
        for (server_name, items) in &assignment {
            let Some(mut record) = self.directory.load(server_name).await? else {
                // Record vanished between listing and commit; fail the pass
                // so the surviving `necessary` flag drives a retry over the
                // current topology.
                warn!(
                    "Job '{}' server '{}' disappeared during resharding",
                    self.config.job_name, server_name
                );
                return Err(CoordError::Store {
                    path: paths::server_path(server_name),
                    message: "server record disappeared before resharding commit".into(),
                });
            };
            record.set_sharding(Some(items));
            ops.push(TxOp::Put {
                path: paths::server_path(server_name),
                data: serde_json::to_string(&record)?,
            });
        }
        ops.push(TxOp::Delete {
            path: SHARDING_NECESSARY.to_string(),
        });
        ops.push(TxOp::Delete {
            path: SHARDING_PROCESSING.to_string(),
        });
        self.store.transaction(ops).await?;
        debug!("Job '{}' resharding complete", self.config.job_name);
        Ok(())
    }

    /// Follower wait: sleep in short intervals until this process becomes
    /// leader or another leader's commit has removed both flags
    async fn wait_for_leader_commit(&self) -> Result<()> {
        loop {
            if self.leader.is_leader().await {
                return Ok(());
            }
            let pending = self.store.exists(SHARDING_NECESSARY).await?
                || self.store.exists(SHARDING_PROCESSING).await?;
            if !pending {
                return Ok(());
            }
            debug!(
                "Job '{}' waiting for resharding to complete",
                self.config.job_name
            );
            sleep(self.config.poll_interval).await;
        }
    }

    /// Execution-exclusive wait: resharding must not overlap live execution
    /// of the old assignment
    async fn wait_for_running_items(&self) {
        while self.execution.has_running_items().await {
            debug!(
                "Job '{}' waiting for running shards to complete",
                self.config.job_name
            );
            sleep(self.config.poll_interval).await;
        }
    }

    /// Clear the `sharding` field on every known server record
    async fn clear_assignments(&self) -> Result<()> {
        for server_name in self.directory.list_all().await? {
            let Some(mut record) = self.directory.load(&server_name).await? else {
                continue;
            };
            if record.sharding.is_none() {
                continue;
            }
            record.set_sharding(None);
            self.directory.save(&server_name, &record).await?;
        }
        Ok(())
    }
}
