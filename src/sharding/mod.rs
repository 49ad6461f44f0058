//! Shard assignment coordination
//!
//! Leader-gated recomputation and atomic commit of the shard-to-server
//! mapping, plus the pluggable allocation strategy seam.

pub mod coordinator;
pub mod items;
pub mod strategy;

pub use coordinator::{ExecutionTracker, LeaderOracle, ReshardingCoordinator};
pub use strategy::{AverageAllocationStrategy, ShardingStrategy};
