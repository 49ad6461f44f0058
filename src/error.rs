//! Error types for the coordination core
//!
//! Covers store access, payload codec, and transaction failures. Expected
//! conditions (absent node, malformed record, empty server list) are not
//! errors; read sites handle them as explicit absent branches.

use thiserror::Error;

/// Primary error type for all coordination operations
#[derive(Debug, Error)]
pub enum CoordError {
    // ========== Store Errors ==========

    /// Coordination store operation failed; external store client bindings
    /// surface their own failures through this variant as well
    #[error("Store operation failed on '{path}': {message}")]
    Store { path: String, message: String },

    /// Multi-op transaction was rejected; no operation was applied
    #[error("Transaction rejected: {reason}")]
    TransactionRejected { reason: String },

    // ========== Codec Errors ==========

    /// Server record payload could not be encoded
    #[error("Failed to encode server record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Convenience result type
pub type Result<T> = std::result::Result<T, CoordError>;
