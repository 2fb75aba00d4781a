//! In-memory implementation of `AuditEntryStore`.
//!
//! `InMemoryAuditStore` keeps each tenant's entries in a `Vec` in append
//! order, protected by a `Mutex`.  It is the reference backend for tests,
//! demos, and single-node deployments; a database-backed implementation of
//! the same trait slots in for production.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use carelog_contracts::{
    entry::{AuditEntry, TenantId},
    error::{AuditError, AuditResult},
};

use crate::traits::AuditEntryStore;

/// An in-memory, append-only audit entry store.
///
/// # Thread safety
///
/// All operations acquire an internal `Mutex`.  Clones share the same
/// underlying map, so a store handed to the append worker and to the
/// verification service observes one consistent state.
#[derive(Clone, Default)]
pub struct InMemoryAuditStore {
    inner: Arc<Mutex<HashMap<TenantId, Vec<AuditEntry>>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entry count across all tenants.  Test and demo convenience.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("audit store lock poisoned");
        inner.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutate one stored entry in place via `f`.
    ///
    /// This exists *only* to simulate out-of-band tampering in tests and
    /// demos — it is exactly the operation the hash chain is designed to
    /// detect, and no production backend has an equivalent.
    ///
    /// Returns false when the tenant or sequence does not exist.
    pub fn tamper_with<F>(&self, tenant: &TenantId, sequence: u64, f: F) -> bool
    where
        F: FnOnce(&mut AuditEntry),
    {
        let mut inner = self.inner.lock().expect("audit store lock poisoned");
        match inner
            .get_mut(tenant)
            .and_then(|entries| entries.iter_mut().find(|e| e.sequence == sequence))
        {
            Some(entry) => {
                f(entry);
                true
            }
            None => false,
        }
    }

    /// Remove one stored entry, simulating out-of-band deletion.
    ///
    /// Test and demo use only, like [`tamper_with`](Self::tamper_with).
    /// Returns false when the tenant or sequence does not exist.
    pub fn remove_entry(&self, tenant: &TenantId, sequence: u64) -> bool {
        let mut inner = self.inner.lock().expect("audit store lock poisoned");
        match inner.get_mut(tenant) {
            Some(entries) => {
                let before = entries.len();
                entries.retain(|e| e.sequence != sequence);
                entries.len() != before
            }
            None => false,
        }
    }
}

impl AuditEntryStore for InMemoryAuditStore {
    /// Append one entry to its tenant's list.
    ///
    /// Rejects an entry whose `sequence` is not exactly the next append
    /// position — the store is the last line of defense against a fork
    /// slipping past the single-writer discipline.
    fn append(&self, entry: AuditEntry) -> AuditResult<()> {
        let mut inner = self.inner.lock().expect("audit store lock poisoned");
        let entries = inner.entry(entry.tenant_id().clone()).or_default();

        let expected = entries.len() as u64;
        if entry.sequence != expected {
            return Err(AuditError::Storage {
                reason: format!(
                    "append out of order for tenant '{}': got sequence {}, expected {}",
                    entry.tenant_id(),
                    entry.sequence,
                    expected
                ),
            });
        }

        debug!(
            tenant_id = %entry.tenant_id(),
            sequence = entry.sequence,
            entry_id = %entry.id,
            "audit entry appended"
        );
        entries.push(entry);
        Ok(())
    }

    fn latest(&self, tenant: &TenantId) -> AuditResult<Option<AuditEntry>> {
        let inner = self.inner.lock().expect("audit store lock poisoned");
        Ok(inner.get(tenant).and_then(|entries| entries.last().cloned()))
    }

    fn at_sequence(&self, tenant: &TenantId, sequence: u64) -> AuditResult<Option<AuditEntry>> {
        let inner = self.inner.lock().expect("audit store lock poisoned");
        Ok(inner
            .get(tenant)
            .and_then(|entries| entries.iter().find(|e| e.sequence == sequence).cloned()))
    }

    /// Event-time range query, ascending by `timestamp`.
    ///
    /// A stable sort keeps append order among entries that share the same
    /// event timestamp.
    fn range(
        &self,
        tenant: &TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AuditResult<Vec<AuditEntry>> {
        let inner = self.inner.lock().expect("audit store lock poisoned");
        let mut hits: Vec<AuditEntry> = inner
            .get(tenant)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.event.timestamp >= start && e.event.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        hits.sort_by_key(|e| e.event.timestamp);
        Ok(hits)
    }

    fn chain(&self, tenant: &TenantId) -> AuditResult<Vec<AuditEntry>> {
        let inner = self.inner.lock().expect("audit store lock poisoned");
        Ok(inner.get(tenant).cloned().unwrap_or_default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use carelog_chain::{hash_entry, GENESIS_HASH};
    use carelog_contracts::entry::{AuditEntry, AuditEntryId, TenantId};
    use carelog_contracts::event::{Actor, AuditCategory, AuditEvent, AuditEventType};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Build an honestly hashed entry at the given sequence, linked to
    /// `prev_hash`, with an event timestamp offset by `ts_offset_secs`.
    fn make_entry(tenant: &str, sequence: u64, prev_hash: &str, ts_offset_secs: i64) -> AuditEntry {
        let event = AuditEvent {
            tenant_id: TenantId::new(tenant),
            event_type: AuditEventType::PhiAccess,
            category: AuditCategory::Privacy,
            actor: Actor {
                user_id: "u-1".to_string(),
                user_name: "Dr. Chen".to_string(),
            },
            action: Some(format!("action-{sequence}")),
            resource: None,
            context: None,
            details: Some(json!({ "seq": sequence })),
            before: None,
            after: None,
            timestamp: Utc::now() + Duration::seconds(ts_offset_secs),
        };
        let id = AuditEntryId::new();
        let recorded_at = Utc::now();
        let hash = hash_entry(sequence, &id, recorded_at, &event, prev_hash);
        AuditEntry {
            id,
            sequence,
            event,
            prev_hash: prev_hash.to_string(),
            hash,
            recorded_at,
        }
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    /// Appended entries come back via latest / at_sequence / chain.
    #[test]
    fn append_and_read_back() {
        let store = InMemoryAuditStore::new();
        let tenant = TenantId::new("t1");

        let e0 = make_entry("t1", 0, GENESIS_HASH, 0);
        let e1 = make_entry("t1", 1, &e0.hash, 1);
        store.append(e0.clone()).unwrap();
        store.append(e1.clone()).unwrap();

        assert_eq!(store.latest(&tenant).unwrap().unwrap().id, e1.id);
        assert_eq!(store.at_sequence(&tenant, 0).unwrap().unwrap().id, e0.id);
        assert!(store.at_sequence(&tenant, 9).unwrap().is_none());

        let chain = store.chain(&tenant).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].sequence, 0);
        assert_eq!(chain[1].sequence, 1);
    }

    /// An empty tenant has no latest entry and an empty chain.
    #[test]
    fn empty_tenant() {
        let store = InMemoryAuditStore::new();
        let tenant = TenantId::new("nobody");

        assert!(store.latest(&tenant).unwrap().is_none());
        assert!(store.chain(&tenant).unwrap().is_empty());
        assert!(store.is_empty());
    }

    /// Out-of-order sequences are rejected with a storage error.
    #[test]
    fn append_rejects_sequence_gap() {
        let store = InMemoryAuditStore::new();

        let e0 = make_entry("t1", 0, GENESIS_HASH, 0);
        store.append(e0.clone()).unwrap();

        // Skipping sequence 1 must fail.
        let e2 = make_entry("t1", 2, &e0.hash, 2);
        let err = store.append(e2).unwrap_err();
        assert!(err.to_string().contains("out of order"));

        // Re-appending sequence 0 (a fork attempt) must also fail.
        let fork = make_entry("t1", 0, GENESIS_HASH, 0);
        assert!(store.append(fork).is_err());
    }

    /// Chains are independent per tenant.
    #[test]
    fn tenants_are_isolated() {
        let store = InMemoryAuditStore::new();

        store.append(make_entry("a", 0, GENESIS_HASH, 0)).unwrap();
        store.append(make_entry("b", 0, GENESIS_HASH, 0)).unwrap();

        assert_eq!(store.chain(&TenantId::new("a")).unwrap().len(), 1);
        assert_eq!(store.chain(&TenantId::new("b")).unwrap().len(), 1);
        assert_eq!(store.len(), 2);
    }

    /// `range` is an event-time view, ascending by timestamp even when
    /// events were appended out of event-time order.
    #[test]
    fn range_orders_by_event_time() {
        let store = InMemoryAuditStore::new();
        let tenant = TenantId::new("t1");

        // Append order 0,1,2 but event times 0s, -30s, +10s.
        let e0 = make_entry("t1", 0, GENESIS_HASH, 0);
        let e1 = make_entry("t1", 1, &e0.hash, -30);
        let e2 = make_entry("t1", 2, &e1.hash, 10);
        for e in [&e0, &e1, &e2] {
            store.append(e.clone()).unwrap();
        }

        let start = Utc::now() - Duration::hours(1);
        let end = Utc::now() + Duration::hours(1);
        let hits = store.range(&tenant, start, end).unwrap();

        assert_eq!(hits.len(), 3);
        // Event-time order: e1 (-30s), e0 (0s), e2 (+10s).
        assert_eq!(hits[0].id, e1.id);
        assert_eq!(hits[1].id, e0.id);
        assert_eq!(hits[2].id, e2.id);
    }

    /// `range` bounds are inclusive and exclude entries outside the window.
    #[test]
    fn range_filters_window() {
        let store = InMemoryAuditStore::new();
        let tenant = TenantId::new("t1");

        let e0 = make_entry("t1", 0, GENESIS_HASH, -3600);
        let e1 = make_entry("t1", 1, &e0.hash, 0);
        store.append(e0.clone()).unwrap();
        store.append(e1.clone()).unwrap();

        let start = Utc::now() - Duration::minutes(10);
        let end = Utc::now() + Duration::minutes(10);
        let hits = store.range(&tenant, start, end).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, e1.id);
    }

    /// The tamper hooks mutate and remove stored entries (test-only paths).
    #[test]
    fn tamper_hooks() {
        let store = InMemoryAuditStore::new();
        let tenant = TenantId::new("t1");

        let e0 = make_entry("t1", 0, GENESIS_HASH, 0);
        let e1 = make_entry("t1", 1, &e0.hash, 1);
        store.append(e0).unwrap();
        store.append(e1).unwrap();

        assert!(store.tamper_with(&tenant, 0, |e| {
            e.event.action = Some("forged".to_string());
        }));
        assert_eq!(
            store.at_sequence(&tenant, 0).unwrap().unwrap().event.action,
            Some("forged".to_string())
        );

        assert!(store.remove_entry(&tenant, 0));
        assert!(store.at_sequence(&tenant, 0).unwrap().is_none());
        assert!(!store.remove_entry(&tenant, 42));
    }
}
