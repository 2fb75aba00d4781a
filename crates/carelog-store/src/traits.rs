//! Trait seams for the durable store and the tip cache.
//!
//! These two traits define the storage boundary of the audit trail:
//!
//! - `AuditEntryStore` — trusted, durable, append-only. Ground truth.
//! - `ChainTipCache`   — fast, TTL-bounded, advisory. Never ground truth.
//!
//! Both are injected into the append worker and the verification service as
//! `Arc<dyn …>` so tests and deployments can swap backends freely.

use chrono::{DateTime, Utc};

use carelog_contracts::{
    entry::{AuditEntry, ChainTip, TenantId},
    error::AuditResult,
};

/// The durable, append-only collection of audit entries.
///
/// Implementations must treat `append` as strictly append-only: entries are
/// never modified or deleted once written.  No update or delete operation
/// exists on this trait, and none may be added.
pub trait AuditEntryStore: Send + Sync {
    /// Durably persist one immutable entry.
    ///
    /// On failure the entry is not considered committed and
    /// `AuditError::Storage` is returned — the caller must not advance any
    /// derived state (in particular, the tip cache).
    fn append(&self, entry: AuditEntry) -> AuditResult<()>;

    /// The most recently appended entry for a tenant, by append order.
    ///
    /// Returns `None` only when the tenant has no entries at all.
    fn latest(&self, tenant: &TenantId) -> AuditResult<Option<AuditEntry>>;

    /// Point lookup by append position.
    ///
    /// Used by the verification service to resolve the true append-order
    /// neighbor at a range boundary.
    fn at_sequence(&self, tenant: &TenantId, sequence: u64) -> AuditResult<Option<AuditEntry>>;

    /// Entries whose event `timestamp` falls in `[start, end]`, ascending by
    /// `timestamp`.
    ///
    /// This is an event-time view for reporting.  It is *not* append order:
    /// producers may enqueue out of event-time order, so consumers that care
    /// about linkage must re-sort by `sequence`.
    fn range(
        &self,
        tenant: &TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AuditResult<Vec<AuditEntry>>;

    /// The tenant's full chain in append order (ascending `sequence`).
    fn chain(&self, tenant: &TenantId) -> AuditResult<Vec<AuditEntry>>;
}

/// A fast tenant → chain-tip cache with a bounded TTL.
///
/// Purely an optimization over `AuditEntryStore::latest`.  The contract every
/// caller must honor: a miss means "consult the durable store", never "the
/// chain is empty".  Only the append worker writes to this cache, and only
/// *after* a successful durable append.
pub trait ChainTipCache: Send + Sync {
    /// The cached tip for a tenant, if present and unexpired.
    fn get_tip(&self, tenant: &TenantId) -> Option<ChainTip>;

    /// Store the tip for a tenant with a refreshed TTL.
    fn set_tip(&self, tenant: &TenantId, tip: ChainTip);
}
