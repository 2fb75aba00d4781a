//! The chain verification service.
//!
//! Replays a tenant's chain (or a time window of it) against the durable
//! store and reports every integrity break.  Two distinct findings:
//!
//! - `HASH_MISMATCH` — the entry's stored hash no longer matches the hash
//!   recomputed from its stored content: the content was altered in place.
//! - `CHAIN_BREAK` — the entry's `prev_hash` or `sequence` does not line up
//!   with its true predecessor: an entry was deleted, reordered, or inserted
//!   out of band.
//!
//! The service reads only the durable store — never the tip cache, which is
//! advisory and carries no integrity guarantee.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use carelog_chain::{recompute_hash, GENESIS_HASH};
use carelog_contracts::{
    entry::{AuditEntry, TenantId},
    error::AuditResult,
    report::{BreakKind, ChainBreak, VerificationReport},
};
use carelog_store::AuditEntryStore;

/// Replays audit chains and reports integrity breaks.
pub struct ChainVerificationService {
    store: Arc<dyn AuditEntryStore>,
}

impl ChainVerificationService {
    pub fn new(store: Arc<dyn AuditEntryStore>) -> Self {
        Self { store }
    }

    /// Verify a tenant's chain, optionally restricted to an event-time window.
    ///
    /// With no bounds, the full chain is replayed in append order and must
    /// root at the genesis sentinel — a first entry whose sequence is not 0
    /// (the tenant's true first entry was deleted) is itself a break.
    ///
    /// With bounds, the store's event-time range is re-sorted by `sequence`
    /// (event time is not linkage order) and the append-order neighbors the
    /// window skips are resolved from the store: the true predecessor at
    /// the leading edge, and any interior entry whose event time falls
    /// outside the window, so linkage is carried through them.  Sequences
    /// are gapless by construction, so a failed lookup means the entry is
    /// gone from the store and is reported as a break, never trusted away.
    ///
    /// Breaks are findings, not errors: the `Err` path is reserved for the
    /// store itself failing.
    pub fn verify(
        &self,
        tenant: &TenantId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> AuditResult<VerificationReport> {
        let windowed = start.is_some() || end.is_some();

        let entries = if windowed {
            let start = start.unwrap_or(DateTime::<Utc>::MIN_UTC);
            let end = end.unwrap_or(DateTime::<Utc>::MAX_UTC);
            let mut hits = self.store.range(tenant, start, end)?;
            // The range is an event-time view; linkage is checked in append
            // order, so re-sort by the explicit sequence field.
            hits.sort_by_key(|e| e.sequence);
            hits
        } else {
            self.store.chain(tenant)?
        };

        if entries.is_empty() {
            let range_note = windowed.then(|| {
                "no entries in the requested window; an empty window is trivially \
                 valid but proves nothing about the rest of the chain"
                    .to_string()
            });
            debug!(tenant_id = %tenant, windowed, "verification window empty");
            return Ok(VerificationReport {
                tenant_id: tenant.clone(),
                valid: true,
                entries_checked: 0,
                breaks: Vec::new(),
                range_note,
            });
        }

        let mut breaks = Vec::new();
        let first = &entries[0];

        // Seed the linkage check.  A full-chain run must root at the
        // genesis sentinel at sequence 0 — a first entry with a higher
        // sequence means the tenant's true first entry was deleted, and the
        // loop below flags it.  A windowed run starting mid-chain resolves
        // the true append-order predecessor at the leading edge; sequences
        // are gapless, so a failed lookup is itself a break.
        let (mut expected_prev, mut expected_seq) = if !windowed || first.sequence == 0 {
            (GENESIS_HASH.to_string(), 0u64)
        } else {
            match self.store.at_sequence(tenant, first.sequence - 1)? {
                Some(pred) => (pred.hash, first.sequence),
                None => {
                    breaks.push(ChainBreak {
                        entry_id: first.id,
                        sequence: first.sequence,
                        position: 1,
                        kind: BreakKind::ChainBreak,
                        detail: format!(
                            "predecessor at sequence {} is missing from the store; an entry \
                             was deleted out of band",
                            first.sequence - 1
                        ),
                    });
                    // Re-seed from the first entry's own claims so the one
                    // missing predecessor does not cascade.
                    (first.prev_hash.clone(), first.sequence)
                }
            }
        };

        for (idx, entry) in entries.iter().enumerate() {
            let position = idx + 1;

            // In a windowed run, an append-order gap before this entry is
            // normally just entries whose event time fell outside the
            // window (event-time order and append order diverge by design).
            // Resolve the skipped sequences from the store and carry the
            // linkage through them; only a failed lookup — an entry the
            // gapless sequence schema says must exist — is a break.
            if windowed && entry.sequence > expected_seq {
                for seq in expected_seq..entry.sequence {
                    match self.store.at_sequence(tenant, seq)? {
                        Some(skipped) => {
                            if skipped.prev_hash != expected_prev {
                                breaks.push(ChainBreak {
                                    entry_id: skipped.id,
                                    sequence: skipped.sequence,
                                    position,
                                    kind: BreakKind::ChainBreak,
                                    detail: format!(
                                        "out-of-window entry at sequence {} does not link to \
                                         its predecessor (expected {}, found {})",
                                        seq, expected_prev, skipped.prev_hash
                                    ),
                                });
                            }
                            expected_prev = skipped.hash.clone();
                            expected_seq = seq + 1;
                        }
                        None => {
                            breaks.push(ChainBreak {
                                entry_id: entry.id,
                                sequence: entry.sequence,
                                position,
                                kind: BreakKind::ChainBreak,
                                detail: format!(
                                    "entry at sequence {} is missing from the store; an entry \
                                     was deleted out of band",
                                    seq
                                ),
                            });
                            // Re-seed from this entry's own claims so one
                            // missing entry does not cascade into spurious
                            // breaks at every later entry.
                            expected_prev = entry.prev_hash.clone();
                            expected_seq = entry.sequence;
                            break;
                        }
                    }
                }
            }

            if entry.prev_hash != expected_prev || entry.sequence != expected_seq {
                breaks.push(linkage_break(entry, position, &expected_prev, expected_seq));
            }

            let recomputed = recompute_hash(entry);
            if recomputed != entry.hash {
                breaks.push(ChainBreak {
                    entry_id: entry.id,
                    sequence: entry.sequence,
                    position,
                    kind: BreakKind::HashMismatch,
                    detail: "stored hash does not match the hash recomputed from the entry's \
                             stored content"
                        .to_string(),
                });
            }

            // Advance against the *stored* hash: the successor's prev_hash
            // was computed against whatever this entry claimed at append
            // time, so a content mutation here must not cascade into a
            // spurious break at the next entry.
            expected_prev = entry.hash.clone();
            expected_seq = entry.sequence + 1;
        }

        let valid = breaks.is_empty();
        if valid {
            info!(
                tenant_id = %tenant,
                entries_checked = entries.len(),
                "chain verified intact"
            );
        } else {
            warn!(
                tenant_id = %tenant,
                entries_checked = entries.len(),
                break_count = breaks.len(),
                "chain verification found integrity breaks"
            );
        }

        Ok(VerificationReport {
            tenant_id: tenant.clone(),
            valid,
            entries_checked: entries.len(),
            breaks,
            range_note: None,
        })
    }
}

fn linkage_break(
    entry: &AuditEntry,
    position: usize,
    expected_prev: &str,
    expected_seq: u64,
) -> ChainBreak {
    let detail = if entry.sequence != expected_seq {
        format!(
            "expected sequence {} but found {}; an entry was deleted, reordered, or \
             inserted out of band",
            expected_seq, entry.sequence
        )
    } else {
        format!(
            "prev_hash does not match the preceding entry's hash (expected {}, found {})",
            expected_prev, entry.prev_hash
        )
    };
    ChainBreak {
        entry_id: entry.id,
        sequence: entry.sequence,
        position,
        kind: BreakKind::ChainBreak,
        detail,
    }
}
