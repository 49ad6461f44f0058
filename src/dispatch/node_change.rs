//! Node-change handling
//!
//! Consumes update events on this worker's own server record and turns
//! pending transitions into local scheduler commands. Events for other
//! workers' records or unrelated paths are ignored; a mark is consumed
//! exactly once.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::JobCoordinationConfig;
use crate::error::Result;
use crate::registry::JobRegistry;
use crate::server::record::PendingTransition;
use crate::server::ServerDirectory;
use crate::store::paths;
use crate::store::{NodeEvent, NodeEventKind};

/// Reacts to updates of this worker's server record
pub struct NodeChangeHandler {
    config: JobCoordinationConfig,
    directory: Arc<ServerDirectory>,
    registry: Arc<JobRegistry>,
}

impl NodeChangeHandler {
    pub fn new(
        config: JobCoordinationConfig,
        directory: Arc<ServerDirectory>,
        registry: Arc<JobRegistry>,
    ) -> Self {
        Self {
            config,
            directory,
            registry,
        }
    }

    /// Apply one node-change event
    pub async fn handle(&self, event: &NodeEvent) -> Result<()> {
        if event.kind != NodeEventKind::Updated {
            return Ok(());
        }
        let Some(local_name) = self.directory.local_server_name() else {
            return Ok(());
        };
        if !paths::is_server_path(&event.path, &local_name) {
            return Ok(());
        }
        // Record removed concurrently; nothing to consume.
        let Some(record) = self.directory.load(&local_name).await? else {
            return Ok(());
        };

        let controller = self.registry.controller(&self.config.job_name);
        match record.pending_transition() {
            Some(PendingTransition::Trigger) => {
                // Consume first, even with no controller attached, so the
                // trigger cannot re-fire once a controller attaches later.
                self.directory.clear_trigger_mark().await?;
                if let Some(controller) = controller {
                    if self.directory.is_local_ready().await? {
                        info!("Job '{}' triggered immediately", self.config.job_name);
                        controller.trigger_now();
                    }
                }
            }
            Some(PendingTransition::Shutdown) => {
                if let Some(controller) = controller {
                    info!("Job '{}' shutting down by request", self.config.job_name);
                    controller.shutdown();
                    self.registry.remove_controller(&self.config.job_name);
                    self.directory.process_shutdown().await?;
                }
            }
            Some(PendingTransition::Pause) => {
                if let Some(controller) = controller {
                    info!("Job '{}' paused by request", self.config.job_name);
                    controller.pause();
                    self.directory.clear_status_mark().await?;
                }
            }
            Some(PendingTransition::Resume) => {
                if let Some(controller) = controller {
                    info!("Job '{}' resumed by request", self.config.job_name);
                    controller.resume();
                    self.directory.clear_pause_mark().await?;
                }
            }
            // Enable/disable transitions feed resharding detection, not the
            // local scheduler; bare status or sharding updates carry no mark.
            Some(PendingTransition::Disable | PendingTransition::Enable) | None => {
                debug!(
                    "Job '{}' record update with no consumable transition",
                    self.config.job_name
                );
            }
        }
        Ok(())
    }
}
