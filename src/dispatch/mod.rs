//! Coordination event dispatch
//!
//! Subscribes to the store's connection-state and node-change streams and
//! feeds them to the two handlers on spawned tasks.

pub mod connection;
pub mod node_change;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::store::CoordinationStore;

pub use connection::ConnectionStateHandler;
pub use node_change::NodeChangeHandler;

/// Wires both handlers onto a store's notification streams
pub struct CoordinationEventDispatcher {
    store: Arc<dyn CoordinationStore>,
    connection: Arc<ConnectionStateHandler>,
    node_change: Arc<NodeChangeHandler>,
}

impl CoordinationEventDispatcher {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        connection: ConnectionStateHandler,
        node_change: NodeChangeHandler,
    ) -> Self {
        Self {
            store,
            connection: Arc::new(connection),
            node_change: Arc::new(node_change),
        }
    }

    /// Spawn both consumer tasks; they run until the store drops its senders
    pub fn start(&self) -> (JoinHandle<()>, JoinHandle<()>) {
        let mut connection_rx = self.store.subscribe_connection();
        let connection = self.connection.clone();
        let connection_task = tokio::spawn(async move {
            loop {
                match connection_rx.recv().await {
                    Ok(state) => {
                        if let Err(err) = connection.handle(state).await {
                            warn!("Connection-state handler failed: {}", err);
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Connection-state stream lagged, {} events missed", missed);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let mut node_rx = self.store.subscribe_nodes();
        let node_change = self.node_change.clone();
        let node_task = tokio::spawn(async move {
            loop {
                match node_rx.recv().await {
                    Ok(event) => {
                        if let Err(err) = node_change.handle(&event).await {
                            warn!("Node-change handler failed: {}", err);
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Node-change stream lagged, {} events missed", missed);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        (connection_task, node_task)
    }
}
