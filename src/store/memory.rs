//! In-process coordination store
//!
//! Full implementation of [`CoordinationStore`] over an ordered in-memory
//! node map. Used as the test substrate and for single-process embedding;
//! session expiry and connection transitions can be injected for tests.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use super::{ConnectionState, CoordinationStore, NodeEvent, NodeEventKind, TxOp};
use crate::error::{CoordError, Result};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Node {
    data: String,
    ephemeral: bool,
}

#[derive(Default)]
struct Inner {
    nodes: BTreeMap<String, Node>,
    sequences: HashMap<String, u64>,
    mutations: u64,
}

/// In-memory store rooted at one job's namespace
pub struct MemoryStore {
    inner: Mutex<Inner>,
    connection_tx: broadcast::Sender<ConnectionState>,
    node_tx: broadcast::Sender<NodeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (connection_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (node_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Inner::default()),
            connection_tx,
            node_tx,
        }
    }

    /// Inject a connection-state transition, as a real client would report it
    pub fn fire_connection(&self, state: ConnectionState) {
        let _ = self.connection_tx.send(state);
    }

    /// Drop every ephemeral node, as the store would on session expiry
    pub fn expire_session(&self) {
        let removed: Vec<String> = {
            let mut inner = self.inner.lock();
            let paths: Vec<String> = inner
                .nodes
                .iter()
                .filter(|(_, node)| node.ephemeral)
                .map(|(path, _)| path.clone())
                .collect();
            for path in &paths {
                inner.nodes.remove(path);
            }
            paths
        };
        for path in removed {
            debug!("Ephemeral node evicted: {}", path);
            self.emit(NodeEventKind::Removed, &path, "");
        }
    }

    /// Number of node mutations applied so far
    pub fn mutation_count(&self) -> u64 {
        self.inner.lock().mutations
    }

    fn emit(&self, kind: NodeEventKind, path: &str, data: &str) {
        let _ = self.node_tx.send(NodeEvent {
            kind,
            path: path.to_string(),
            data: data.to_string(),
        });
    }

    fn put(&self, path: &str, data: &str, ephemeral: bool) {
        let kind = {
            let mut inner = self.inner.lock();
            inner.mutations += 1;
            let kind = if inner.nodes.contains_key(path) {
                NodeEventKind::Updated
            } else {
                NodeEventKind::Added
            };
            inner.nodes.insert(
                path.to_string(),
                Node {
                    data: data.to_string(),
                    ephemeral,
                },
            );
            kind
        };
        self.emit(kind, path, data);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CoordinationStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().nodes.get(path).map(|n| n.data.clone()))
    }

    async fn create(&self, path: &str, data: &str) -> Result<()> {
        if self.inner.lock().nodes.contains_key(path) {
            return Ok(());
        }
        self.put(path, data, false);
        Ok(())
    }

    async fn update(&self, path: &str, data: &str) -> Result<()> {
        let ephemeral = self
            .inner
            .lock()
            .nodes
            .get(path)
            .map(|n| n.ephemeral)
            .unwrap_or(false);
        self.put(path, data, ephemeral);
        Ok(())
    }

    async fn create_ephemeral(&self, path: &str, data: &str) -> Result<()> {
        self.put(path, data, true);
        Ok(())
    }

    async fn create_ephemeral_sequential(&self, prefix: &str, data: &str) -> Result<String> {
        let path = {
            let mut inner = self.inner.lock();
            let seq = inner.sequences.entry(prefix.to_string()).or_insert(0);
            let path = format!("{}{:010}", prefix, seq);
            *seq += 1;
            path
        };
        self.put(&path, data, true);
        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let existed = {
            let mut inner = self.inner.lock();
            let existed = inner.nodes.remove(path).is_some();
            if existed {
                inner.mutations += 1;
            }
            existed
        };
        if existed {
            self.emit(NodeEventKind::Removed, path, "");
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.inner.lock().nodes.contains_key(path))
    }

    async fn children(&self, path: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", path);
        let children = self
            .inner
            .lock()
            .nodes
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(|rest| rest.to_string())
            .collect();
        Ok(children)
    }

    async fn transaction(&self, ops: Vec<TxOp>) -> Result<()> {
        let events = {
            let mut inner = self.inner.lock();
            // Validate every op before touching the tree; both puts and
            // deletes require the node to exist, matching the store's
            // all-or-nothing contract.
            for op in &ops {
                let (TxOp::Put { path, .. } | TxOp::Delete { path }) = op;
                if !inner.nodes.contains_key(path) {
                    return Err(CoordError::TransactionRejected {
                        reason: format!("operation on missing node '{}'", path),
                    });
                }
            }
            let mut events = Vec::with_capacity(ops.len());
            for op in ops {
                inner.mutations += 1;
                match op {
                    TxOp::Put { path, data } => {
                        let ephemeral = inner
                            .nodes
                            .get(&path)
                            .map(|n| n.ephemeral)
                            .unwrap_or(false);
                        inner.nodes.insert(
                            path.clone(),
                            Node {
                                data: data.clone(),
                                ephemeral,
                            },
                        );
                        events.push((NodeEventKind::Updated, path, data));
                    }
                    TxOp::Delete { path } => {
                        inner.nodes.remove(&path);
                        events.push((NodeEventKind::Removed, path, String::new()));
                    }
                }
            }
            events
        };
        for (kind, path, data) in events {
            self.emit(kind, &path, &data);
        }
        Ok(())
    }

    fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionState> {
        self.connection_tx.subscribe()
    }

    fn subscribe_nodes(&self) -> broadcast::Receiver<NodeEvent> {
        self.node_tx.subscribe()
    }
}
