//! Store path layout for a job's coordination subtree
//!
//! All paths are relative to the job root: `servers/<ip>_<seq>` holds one
//! server record; `sharding/necessary` and `sharding/processing` are the
//! resharding flag nodes.

/// Root of the server records subtree
pub const SERVERS_ROOT: &str = "servers";

/// Persistent flag: a resharding pass is pending
pub const SHARDING_NECESSARY: &str = "sharding/necessary";

/// Ephemeral flag: the leader is actively recomputing the assignment
pub const SHARDING_PROCESSING: &str = "sharding/processing";

/// Path of a named server's record node
pub fn server_path(server_name: &str) -> String {
    format!("{}/{}", SERVERS_ROOT, server_name)
}

/// Sequential-create prefix for a server on the given IP; the store appends
/// the sequence suffix to form `servers/<ip>_<seq>`
pub fn server_base(ip: &str) -> String {
    format!("{}/{}_", SERVERS_ROOT, ip)
}

/// Extract the server name from a server-record path
pub fn server_name_of(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(SERVERS_ROOT)?.strip_prefix('/')?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(rest)
}

/// Whether the path is the record node of the given server
pub fn is_server_path(path: &str, server_name: &str) -> bool {
    server_name_of(path) == Some(server_name)
}
