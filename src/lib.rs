//! Shardcoord Core - Coordination core for elastic job sharding
//!
//! This crate provides the protocol layer that lets many identical worker
//! processes divide a fixed number of shards among themselves through a
//! shared hierarchical coordination store:
//! - Server liveness records and pending-transition marks
//! - Leader-gated resharding with an atomic commit
//! - Event-driven reaction to store notifications

pub mod config;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod server;
pub mod sharding;
pub mod store;

pub use config::JobCoordinationConfig;
pub use error::{CoordError, Result};
pub use registry::{JobRegistry, SchedulerControl};
pub use server::{ServerDirectory, ServerRecord, ServerStatus};
pub use sharding::{ExecutionTracker, LeaderOracle, ReshardingCoordinator, ShardingStrategy};
pub use store::{ConnectionState, CoordinationStore, NodeEvent, TxOp};

/// Default interval between re-checks in the coordinator's wait loops
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
