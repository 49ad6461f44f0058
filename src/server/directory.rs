//! Server directory
//!
//! CRUD and availability predicates over the server records stored one per
//! worker under `servers/`. Every read treats an absent or undecodable
//! payload as "no record"; overwrites are last-writer-wins.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::registry::JobRegistry;
use crate::server::record::{ServerRecord, ServerStatus};
use crate::store::paths;
use crate::store::CoordinationStore;

/// Directory of the job's server records, bound to this worker's identity
pub struct ServerDirectory {
    job_name: String,
    host_name: String,
    host_ip: String,
    store: Arc<dyn CoordinationStore>,
    registry: Arc<JobRegistry>,
}

impl ServerDirectory {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        registry: Arc<JobRegistry>,
        job_name: impl Into<String>,
        host_name: impl Into<String>,
        host_ip: impl Into<String>,
    ) -> Self {
        let job_name = job_name.into();
        Self {
            job_name,
            host_name: host_name.into(),
            host_ip: host_ip.into(),
            store,
            registry,
        }
    }

    /// The server name this worker registered under, if any
    pub fn local_server_name(&self) -> Option<String> {
        self.registry.server_name(&self.job_name)
    }

    /// Register this worker's server record.
    ///
    /// Idempotent: a first call creates a fresh ephemeral sequential node;
    /// a repeat call against a live record only resets its status to READY;
    /// a call after session expiry (node pruned) recreates the record. Safe
    /// to call both at startup and from the reconnect repair path.
    pub async fn register(&self, enabled: bool) -> Result<()> {
        let Some(server_name) = self.local_server_name() else {
            return self.create_record(enabled).await;
        };
        if !self.store.exists(&paths::server_path(&server_name)).await? {
            return self.create_record(enabled).await;
        }
        let record = match self.load(&server_name).await? {
            Some(mut record) => {
                record.status = ServerStatus::Ready;
                record
            }
            None => ServerRecord::new(&self.host_name, &self.host_ip, !enabled),
        };
        self.save(&server_name, &record).await
    }

    async fn create_record(&self, enabled: bool) -> Result<()> {
        let record = ServerRecord::new(&self.host_name, &self.host_ip, !enabled);
        let payload = serde_json::to_string(&record)?;
        let path = self
            .store
            .create_ephemeral_sequential(&paths::server_base(&self.host_ip), &payload)
            .await?;
        if let Some(server_name) = paths::server_name_of(&path) {
            self.registry.set_server_name(&self.job_name, server_name);
            info!(
                "Job '{}' registered server '{}' on {}",
                self.job_name, server_name, self.host_ip
            );
        }
        Ok(())
    }

    /// Load a named server record; `None` when absent or undecodable
    pub async fn load(&self, server_name: &str) -> Result<Option<ServerRecord>> {
        let Some(payload) = self.store.get(&paths::server_path(server_name)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&payload) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                warn!(
                    "Job '{}' server '{}' has undecodable record, treating as absent: {}",
                    self.job_name, server_name, err
                );
                Ok(None)
            }
        }
    }

    /// Load this worker's own record
    pub async fn load_local(&self) -> Result<Option<ServerRecord>> {
        match self.local_server_name() {
            Some(server_name) => self.load(&server_name).await,
            None => Ok(None),
        }
    }

    /// Overwrite a server record; no concurrency check, last writer wins
    pub async fn save(&self, server_name: &str, record: &ServerRecord) -> Result<()> {
        let payload = serde_json::to_string(record)?;
        self.store
            .update(&paths::server_path(server_name), &payload)
            .await
    }

    /// Remove a server record if it exists
    pub async fn remove(&self, server_name: &str) -> Result<()> {
        self.store.delete(&paths::server_path(server_name)).await
    }

    /// Remove this worker's record and forget its server name
    pub async fn deregister_local(&self) -> Result<()> {
        if let Some(server_name) = self.local_server_name() {
            self.remove(&server_name).await?;
        }
        self.registry.remove_server_name(&self.job_name);
        Ok(())
    }

    /// All registered server names in lexicographic order
    pub async fn list_all(&self) -> Result<Vec<String>> {
        let mut names = self.store.children(paths::SERVERS_ROOT).await?;
        names.sort();
        Ok(names)
    }

    /// Servers eligible for assignment: exist, not disabled, not shut down
    pub async fn shardable_servers(&self) -> Result<Vec<String>> {
        let mut result = Vec::new();
        for name in self.list_all().await? {
            if self.is_shardable(&name).await? {
                result.push(name);
            }
        }
        Ok(result)
    }

    /// Shardable servers that are not paused either
    pub async fn available_servers(&self) -> Result<Vec<String>> {
        let mut result = Vec::new();
        for name in self.list_all().await? {
            if self.is_available(&name).await? {
                result.push(name);
            }
        }
        Ok(result)
    }

    pub async fn is_shardable(&self, server_name: &str) -> Result<bool> {
        Ok(match self.load(server_name).await? {
            Some(record) => !record.disabled && !record.shutdown,
            None => false,
        })
    }

    pub async fn is_available(&self, server_name: &str) -> Result<bool> {
        Ok(match self.load(server_name).await? {
            Some(record) => !record.disabled && !record.shutdown && !record.paused,
            None => false,
        })
    }

    /// Whether this worker is available and waiting for the next fire
    pub async fn is_local_ready(&self) -> Result<bool> {
        Ok(match self.load_local().await? {
            Some(record) => {
                !record.disabled
                    && !record.shutdown
                    && !record.paused
                    && record.status == ServerStatus::Ready
            }
            None => false,
        })
    }

    /// Whether this worker's record is enabled
    pub async fn is_local_enabled(&self) -> Result<bool> {
        Ok(match self.load_local().await? {
            Some(record) => !record.disabled,
            None => false,
        })
    }

    /// Whether the record shows an operator pause with no pending mark,
    /// i.e. a pause that was already consumed and must survive reconnects
    pub async fn is_paused_manually(&self) -> Result<bool> {
        Ok(match self.load_local().await? {
            Some(record) => record.paused,
            None => false,
        })
    }

    /// A server stopped being assignable: record gone, or a disable or
    /// shutdown transition is pending
    pub async fn went_off(&self, server_name: &str) -> Result<bool> {
        Ok(match self.load(server_name).await? {
            Some(record) => record.is_disabled_with_mark() || record.is_shutdown_with_mark(),
            None => true,
        })
    }

    /// A server became assignable again: an enable transition is pending
    pub async fn went_on(&self, server_name: &str) -> Result<bool> {
        Ok(match self.load(server_name).await? {
            Some(record) => record.is_enabled_with_mark(),
            None => false,
        })
    }

    /// Shard indices currently assigned to this worker
    pub async fn local_sharding_items(&self) -> Result<Vec<u32>> {
        Ok(match self.load_local().await? {
            Some(record) => record.sharding_items(),
            None => Vec::new(),
        })
    }

    /// Flip this worker's status around a fire
    pub async fn update_status(&self, status: ServerStatus) -> Result<()> {
        self.mutate_local(|record| record.status = status).await
    }

    /// Consume a trigger transition: settle trigger=false, clear the tag
    pub async fn clear_trigger_mark(&self) -> Result<()> {
        self.mutate_local(|record| record.set_trigger_and_clear_mark(false))
            .await
    }

    /// Consume a resume transition: settle paused=false, clear the tag
    pub async fn clear_pause_mark(&self) -> Result<()> {
        self.mutate_local(|record| record.set_paused_and_clear_mark(false))
            .await
    }

    /// Consume a transition without touching any boolean
    pub async fn clear_status_mark(&self) -> Result<()> {
        self.mutate_local(ServerRecord::clear_mark).await
    }

    /// Acknowledge a shutdown transition: settle shutdown=false, clear the tag
    pub async fn process_shutdown(&self) -> Result<()> {
        self.mutate_local(|record| record.set_shutdown_and_clear_mark(false))
            .await
    }

    async fn mutate_local(&self, mutate: impl FnOnce(&mut ServerRecord)) -> Result<()> {
        let Some(server_name) = self.local_server_name() else {
            return Ok(());
        };
        let Some(mut record) = self.load(&server_name).await? else {
            debug!(
                "Job '{}' local record absent, skipping mutation",
                self.job_name
            );
            return Ok(());
        };
        mutate(&mut record);
        self.save(&server_name, &record).await
    }
}
