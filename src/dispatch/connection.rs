//! Connection-state handling
//!
//! Pauses the local scheduler when the store session is lost and repairs
//! this worker's state on reconnect. Repair re-registers the ephemeral
//! record, drops stale running markers, and resumes unless an operator
//! pause survives the disconnect.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::JobCoordinationConfig;
use crate::error::Result;
use crate::registry::JobRegistry;
use crate::server::ServerDirectory;
use crate::sharding::ExecutionTracker;
use crate::store::ConnectionState;

/// Reacts to connection-state transitions for one job
pub struct ConnectionStateHandler {
    config: JobCoordinationConfig,
    directory: Arc<ServerDirectory>,
    execution: Arc<dyn ExecutionTracker>,
    registry: Arc<JobRegistry>,
}

impl ConnectionStateHandler {
    pub fn new(
        config: JobCoordinationConfig,
        directory: Arc<ServerDirectory>,
        execution: Arc<dyn ExecutionTracker>,
        registry: Arc<JobRegistry>,
    ) -> Self {
        Self {
            config,
            directory,
            execution,
            registry,
        }
    }

    /// Apply one connection-state transition
    pub async fn handle(&self, state: ConnectionState) -> Result<()> {
        match state {
            ConnectionState::Lost => {
                // The session is gone and this worker's liveness node may
                // already be evicted; stop scheduling until repaired.
                warn!(
                    "Job '{}' lost store connection, pausing scheduler",
                    self.config.job_name
                );
                if let Some(controller) = self.registry.controller(&self.config.job_name) {
                    controller.pause();
                }
                Ok(())
            }
            ConnectionState::Reconnected => self.repair().await,
            ConnectionState::Connected | ConnectionState::Suspended => Ok(()),
        }
    }

    async fn repair(&self) -> Result<()> {
        info!(
            "Job '{}' reconnected to store, repairing server state",
            self.config.job_name
        );
        self.directory.register(self.config.enabled).await?;

        // Execution-lock state recorded before the disconnect cannot be
        // trusted; another worker may have taken over those shards.
        let items = self.directory.local_sharding_items().await?;
        self.execution.clear_running_marks(&items).await;

        if !self.directory.is_paused_manually().await? {
            if let Some(controller) = self.registry.controller(&self.config.job_name) {
                controller.resume();
            }
        }
        Ok(())
    }
}
