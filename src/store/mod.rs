//! Coordination store abstraction
//!
//! Hierarchical key-value tree with ephemeral nodes, sequential names,
//! multi-op transactions, and change notifications. A store handle is
//! rooted at one job's namespace; all paths are relative to that root.

pub mod memory;
pub mod paths;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;

pub use memory::MemoryStore;

/// One operation inside a multi-op transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOp {
    /// Overwrite an existing node's data; the node must exist when the
    /// transaction applies
    Put { path: String, data: String },
    /// Delete a node; the node must exist when the transaction applies
    Delete { path: String },
}

/// Client connection state as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Session established
    Connected,
    /// Connection interrupted, session may still be recoverable
    Suspended,
    /// Session lost; ephemeral nodes owned by it are evicted
    Lost,
    /// Session re-established after an interruption
    Reconnected,
}

/// Kind of a node-change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEventKind {
    Added,
    Updated,
    Removed,
}

/// A node-change notification from the store
#[derive(Debug, Clone)]
pub struct NodeEvent {
    pub kind: NodeEventKind,
    /// Path relative to the job root
    pub path: String,
    /// Node payload after the change; empty for removals
    pub data: String,
}

/// Abstract coordination store, scoped to one job's subtree.
///
/// Watches are delivered as broadcast streams; implementations may deliver
/// events for the whole subtree and leave path filtering to subscribers.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Read node data; `None` when the node does not exist
    async fn get(&self, path: &str) -> Result<Option<String>>;

    /// Create a persistent node if absent; no-op when it already exists
    async fn create(&self, path: &str, data: &str) -> Result<()>;

    /// Write node data, creating the node when absent
    async fn update(&self, path: &str, data: &str) -> Result<()>;

    /// Create an ephemeral node tied to this session
    async fn create_ephemeral(&self, path: &str, data: &str) -> Result<()>;

    /// Create an ephemeral node named `<prefix><sequence>`; returns the
    /// assigned full path
    async fn create_ephemeral_sequential(&self, prefix: &str, data: &str) -> Result<String>;

    /// Delete a node if it exists
    async fn delete(&self, path: &str) -> Result<()>;

    /// Whether a node exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// List direct child keys of a node, unordered
    async fn children(&self, path: &str) -> Result<Vec<String>>;

    /// Execute all operations atomically; either every op applies or none
    async fn transaction(&self, ops: Vec<TxOp>) -> Result<()>;

    /// Subscribe to connection-state transitions
    fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionState>;

    /// Subscribe to node-change events for the job subtree
    fn subscribe_nodes(&self) -> broadcast::Receiver<NodeEvent>;
}
