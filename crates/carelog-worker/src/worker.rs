//! The append worker: the single authority that extends a tenant's chain.
//!
//! Processing one queued event is a fixed five-step protocol:
//!
//!   1. Resolve the previous hash — tip cache first, durable store on miss,
//!      genesis sentinel when the tenant has no entries at all.
//!   2. Assign a fresh entry id, the next sequence, and the append timestamp.
//!   3. Compute the entry hash over the full content plus the previous hash.
//!   4. Durably append.  On failure the entry is not committed and the
//!      cache is left untouched.
//!   5. Only after a successful append, advance the cached tip.
//!
//! Steps 4 and 5 must never be inverted: the cache may lag the store (it
//! self-heals within one TTL) but must never run ahead of it.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use carelog_chain::{hash_entry, GENESIS_HASH};
use carelog_contracts::{
    entry::{AuditEntry, AuditEntryId, ChainTip},
    error::AuditResult,
    event::AuditEvent,
};
use carelog_store::{AuditEntryStore, ChainTipCache};

/// The single-writer append worker.
///
/// One `process()` call fully completes before the next begins on any given
/// chain — the pool in [`crate::pool`] guarantees this by routing each
/// tenant to exactly one sequential shard.  The worker itself holds no
/// mutable state; the store and cache are the only side-effect targets.
pub struct AuditAppendWorker {
    store: Arc<dyn AuditEntryStore>,
    cache: Arc<dyn ChainTipCache>,
}

impl AuditAppendWorker {
    pub fn new(store: Arc<dyn AuditEntryStore>, cache: Arc<dyn ChainTipCache>) -> Self {
        Self { store, cache }
    }

    /// Process one queued audit event, extending its tenant's chain.
    ///
    /// Returns the durably appended entry.  On `Err` nothing was committed
    /// and the cached tip was not touched; the caller (the shard loop, or
    /// an external queue) decides whether to retry.
    pub fn process(&self, event: AuditEvent) -> AuditResult<AuditEntry> {
        let tenant = event.tenant_id.clone();

        // ── Step 1: resolve the chain tip ─────────────────────────────────────
        //
        // A cache miss is never "chain is empty": fall back to the durable
        // store's latest entry, and only treat the chain as empty when the
        // store has nothing either.
        let (prev_hash, sequence) = match self.cache.get_tip(&tenant) {
            Some(tip) => (tip.hash, tip.sequence + 1),
            None => match self.store.latest(&tenant)? {
                Some(last) => {
                    // Write the resolved tip back so the next append for this
                    // tenant hits the cache again.
                    self.cache.set_tip(
                        &tenant,
                        ChainTip {
                            hash: last.hash.clone(),
                            sequence: last.sequence,
                        },
                    );
                    (last.hash, last.sequence + 1)
                }
                None => (GENESIS_HASH.to_string(), 0),
            },
        };

        // ── Steps 2–3: mint the entry ─────────────────────────────────────────
        let id = AuditEntryId::new();
        let recorded_at = Utc::now();
        let hash = hash_entry(sequence, &id, recorded_at, &event, &prev_hash);

        let entry = AuditEntry {
            id,
            sequence,
            event,
            prev_hash,
            hash: hash.clone(),
            recorded_at,
        };

        // ── Step 4: durable append ────────────────────────────────────────────
        //
        // The `?` here is the consistency discipline: on failure we return
        // before the cache write below, so the cache never points at an
        // entry the store does not hold.
        self.store.append(entry.clone())?;

        // ── Step 5: advance the cached tip ────────────────────────────────────
        self.cache.set_tip(&tenant, ChainTip { hash, sequence });

        debug!(
            tenant_id = %tenant,
            sequence,
            entry_id = %entry.id,
            "audit chain extended"
        );

        Ok(entry)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
