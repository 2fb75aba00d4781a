//! # carelog-chain
//!
//! Pure hash-chain primitives for the CARELOG audit trail.
//!
//! Every audit entry commits to the previous entry via its SHA-256 hash.
//! Tampering with any stored field — even a single byte — changes the
//! recomputed hash and is detected by the verification service.
//!
//! This crate is deliberately free of state and I/O: it exposes the genesis
//! sentinel and two pure functions.
//!
//! Hash input layout (bytes, in order):
//!   1. tenant id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. entry id as hyphenated-UUID UTF-8 bytes
//!   4. append timestamp as RFC 3339 UTF-8 bytes
//!   5. prev_hash as UTF-8 bytes (64 ASCII hex chars, or the genesis sentinel)
//!   6. canonical JSON of the producer event (serde_json, no pretty-printing)
//!
//! Every stored field of an `AuditEntry` except `hash` itself contributes,
//! so nothing can be altered without detection.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use carelog_contracts::entry::{AuditEntry, AuditEntryId};
use carelog_contracts::event::AuditEvent;

/// The sentinel `prev_hash` used for the first entry in every tenant's chain.
///
/// 64 hex zeros — a value that can never be the SHA-256 of real data, making
/// genesis detection unambiguous.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Compute the SHA-256 hash for a single audit entry.
///
/// The hash commits to every field that identifies the entry: the tenant
/// whose chain it extends, its append position (`sequence`), its unique id,
/// the time it was appended, its link to the previous entry (`prev_hash`),
/// and the full producer event.
///
/// Returns a lowercase 64-character hex string.
///
/// # Panics
///
/// Panics if `event` cannot be serialized to JSON — which cannot happen for
/// the well-formed `AuditEvent` type.
pub fn hash_entry(
    sequence: u64,
    id: &AuditEntryId,
    recorded_at: DateTime<Utc>,
    event: &AuditEvent,
    prev_hash: &str,
) -> String {
    // serde_json::to_vec produces deterministic JSON for the same value:
    // struct fields serialize in declaration order with no whitespace.
    let event_json =
        serde_json::to_vec(event).expect("AuditEvent must always be serializable to JSON");

    let mut hasher = Sha256::new();
    hasher.update(event.tenant_id.0.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(id.to_string().as_bytes());
    hasher.update(
        recorded_at
            .to_rfc3339_opts(SecondsFormat::Micros, true)
            .as_bytes(),
    );
    hasher.update(prev_hash.as_bytes());
    hasher.update(&event_json);

    hex::encode(hasher.finalize())
}

/// Re-derive the hash of a stored entry from its own fields.
///
/// For an untampered entry this reproduces `entry.hash` exactly.  Used by
/// the verification service and by tests; the append worker calls
/// [`hash_entry`] directly because it builds the entry as it goes.
pub fn recompute_hash(entry: &AuditEntry) -> String {
    hash_entry(
        entry.sequence,
        &entry.id,
        entry.recorded_at,
        &entry.event,
        &entry.prev_hash,
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
