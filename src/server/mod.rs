//! Server state model and directory
//!
//! One record per worker process, stored under `servers/` in the job
//! subtree, plus the CRUD and availability layer over those records.

pub mod directory;
pub mod record;

pub use directory::ServerDirectory;
pub use record::{MarkedItem, PendingTransition, ServerRecord, ServerStatus};
