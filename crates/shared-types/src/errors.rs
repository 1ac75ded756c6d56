//! # Error Types
//!
//! Defines error types used across subsystems.

use thiserror::Error;

/// Errors returned by a `ChainClient` implementation.
///
/// Subsystems wrap these as `ExternalCallFailed`; the message is kept
/// human-readable and never carries raw transport detail beyond it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Transport or node-side failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The call or transaction reverted.
    #[error("Execution reverted: {reason}")]
    Reverted { reason: String },

    /// Upstream timeout reported by the client.
    #[error("Timed out waiting for {operation}")]
    Timeout { operation: String },

    /// Unknown transaction hash passed to `wait_for_receipt`.
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    /// The contract returned a value of a different type than requested.
    #[error("Unexpected return value: expected {expected}, got {actual}")]
    UnexpectedValue {
        expected: &'static str,
        actual: &'static str,
    },
}
