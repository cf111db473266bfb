//! Error types for ledger operations.
//!
//! Every mutating call either commits fully or reports exactly one of these
//! kinds with no partial state change. None are retried internally; retry
//! policy belongs to the caller.

use thiserror::Error;

use super::types::CircleId;

/// Error type for ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed or empty arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown circle identifier.
    #[error("Circle not found: {0}")]
    NotFound(CircleId),

    /// Caller lacks the required role.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller already holds a membership in the circle.
    #[error("Already a member of circle {0}")]
    AlreadyMember(CircleId),

    /// Caller holds no membership in the circle.
    #[error("Not a member of circle {0}")]
    NotMember(CircleId),

    /// Circle is at its configured capacity.
    #[error("Circle {0} is full")]
    CircleFull(CircleId),

    /// Circle has been archived and rejects further mutation.
    #[error("Circle {0} is archived")]
    CircleArchived(CircleId),

    /// Attestation was rejected, missing, or the verifier failed (fail-closed).
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Message counter is saturated; further posts are rejected.
    #[error("Message quota exceeded for circle {0}")]
    MessageQuotaExceeded(CircleId),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
