//! Durable audit entry and chain tip types.
//!
//! `AuditEntry` is one link in a tenant's hash chain — it wraps the producer
//! event with a sequence number, append timestamp, and the SHA-256 hashes
//! that make tampering detectable.  `ChainTip` is the cached "most recent
//! hash" value the append worker consults before extending a chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::AuditEvent;

/// Stable identifier for a tenant (one hospital / organization).
///
/// Every chain is scoped to exactly one tenant; chains are never linked
/// across tenants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a single audit entry, assigned at append time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub uuid::Uuid);

impl AuditEntryId {
    /// Create a new, unique entry ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One immutable link in a tenant's audit hash chain.
///
/// Created exactly once, by the append worker, when a queued event is
/// successfully processed.  Entries are never mutated or deleted; a
/// correction is expressed as a *new* entry referencing the original.
///
/// `sequence` is the explicit per-tenant append order, starting at 0.
/// It is deliberately separate from `event.timestamp`: linkage order is
/// append order, and event time is only a reporting view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Globally unique identifier, assigned at append time.
    pub id: AuditEntryId,

    /// Per-tenant append position, starting at 0 with no gaps.
    pub sequence: u64,

    /// The producer event this entry records (includes `tenant_id`).
    pub event: AuditEvent,

    /// SHA-256 hash (hex) of the previous entry in this tenant's chain, or
    /// the genesis sentinel for the tenant's first entry.
    pub prev_hash: String,

    /// SHA-256 hash (hex) over this entry's full content plus `prev_hash`.
    ///
    /// Recomputing the hash from the stored fields must reproduce this
    /// value, for every entry, forever.
    pub hash: String,

    /// When the entry was durably appended (worker-stamped, UTC).
    ///
    /// Distinct from `event.timestamp`, which is when the underlying event
    /// occurred according to the producer.
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// The tenant whose chain this entry belongs to.
    pub fn tenant_id(&self) -> &TenantId {
        &self.event.tenant_id
    }
}

/// The cached "most recently appended" position for one tenant's chain.
///
/// Purely an optimization over querying the durable store for the latest
/// entry.  Never authoritative: readers must treat a cache miss as "consult
/// the store", not as "chain is empty".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    /// The `hash` of the most recently appended entry.
    pub hash: String,
    /// The `sequence` of that entry.
    pub sequence: u64,
}
