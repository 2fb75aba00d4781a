//! Error taxonomy for the CARELOG audit trail.
//!
//! All fallible operations in the append and verification paths return
//! `AuditResult<T>`.  Integrity findings (hash mismatch, chain break) are
//! deliberately *not* errors — they are data in a `VerificationReport`.

use thiserror::Error;

/// The unified error type for the CARELOG audit crates.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The durable store failed to append or read an entry.
    ///
    /// On the append path this propagates to the queue's retry policy; the
    /// entry is not considered committed and the tip cache is left untouched.
    #[error("audit storage failed: {reason}")]
    Storage { reason: String },

    /// The audit event queue has shut down; no more events can be enqueued.
    #[error("audit queue is closed")]
    QueueClosed,

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

/// Convenience alias used throughout the CARELOG crates.
pub type AuditResult<T> = Result<T, AuditError>;
