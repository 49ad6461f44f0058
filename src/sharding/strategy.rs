//! Shard allocation strategies
//!
//! A strategy partitions the shard index range `[0, total)` across the
//! given servers: every index appears in exactly one server's list.

use std::collections::HashMap;

use tracing::debug;

/// Pluggable allocation strategy
pub trait ShardingStrategy: Send + Sync {
    /// Partition `[0, total_shards)` across `servers`.
    ///
    /// Contract: the returned lists cover every index exactly once. Servers
    /// may receive an empty list when there are more servers than shards.
    fn allocate(&self, servers: &[String], total_shards: u32) -> HashMap<String, Vec<u32>>;
}

/// Even contiguous allocation.
///
/// Each server gets a contiguous block of `total / n` indices in server
/// order; the first `total % n` servers get one extra index.
pub struct AverageAllocationStrategy;

impl ShardingStrategy for AverageAllocationStrategy {
    fn allocate(&self, servers: &[String], total_shards: u32) -> HashMap<String, Vec<u32>> {
        if servers.is_empty() {
            return HashMap::new();
        }
        let server_count = servers.len() as u32;
        let base = total_shards / server_count;
        let extra = total_shards % server_count;

        let mut result = HashMap::with_capacity(servers.len());
        let mut cursor = 0u32;
        for (index, server) in servers.iter().enumerate() {
            let count = base + u32::from((index as u32) < extra);
            result.insert(server.clone(), (cursor..cursor + count).collect());
            cursor += count;
        }

        debug!(
            "Allocated {} shards across {} servers",
            total_shards, server_count
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_uneven_split_front_loads_remainder() {
        let allocation = AverageAllocationStrategy.allocate(&servers(&["a", "b", "c"]), 4);
        assert_eq!(allocation["a"], vec![0, 1]);
        assert_eq!(allocation["b"], vec![2]);
        assert_eq!(allocation["c"], vec![3]);
    }

    #[test]
    fn test_allocation_is_a_partition() {
        for total in 1..=20u32 {
            for count in 1..=5usize {
                let names: Vec<String> = (0..count).map(|i| format!("server-{}", i)).collect();
                let allocation = AverageAllocationStrategy.allocate(&names, total);
                let mut seen: Vec<u32> =
                    allocation.values().flatten().copied().collect();
                seen.sort_unstable();
                assert_eq!(seen, (0..total).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_more_servers_than_shards() {
        let allocation = AverageAllocationStrategy.allocate(&servers(&["a", "b", "c"]), 2);
        assert_eq!(allocation["a"], vec![0]);
        assert_eq!(allocation["b"], vec![1]);
        assert!(allocation["c"].is_empty());
    }

    #[test]
    fn test_empty_server_list() {
        assert!(AverageAllocationStrategy.allocate(&[], 8).is_empty());
    }
}
