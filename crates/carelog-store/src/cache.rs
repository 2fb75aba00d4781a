//! In-memory TTL-bounded implementation of `ChainTipCache`.
//!
//! The tip cache exists to avoid a durable-store read on every append.  Its
//! TTL is the recovery backstop: if a crash leaves the cache stale (append
//! succeeded, tip update never ran), the stale value expires within one TTL
//! and the next append falls back to the durable store and self-heals.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::trace;

use carelog_contracts::entry::{ChainTip, TenantId};

use crate::traits::ChainTipCache;

/// Default tip lifetime: one hour, the bound on post-crash staleness.
pub const DEFAULT_TIP_TTL: Duration = Duration::from_secs(3600);

/// An in-memory tenant → chain-tip map with per-entry TTL.
///
/// Expired entries read as absent; they are dropped lazily on access.
/// `set_tip` always refreshes the TTL.
#[derive(Clone)]
pub struct InMemoryTipCache {
    inner: Arc<Mutex<HashMap<TenantId, (ChainTip, Instant)>>>,
    ttl: Duration,
}

impl InMemoryTipCache {
    /// Create a cache with the given tip lifetime.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Drop every cached tip.  Simulates a cold start in tests and demos.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("tip cache lock poisoned");
        inner.clear();
    }
}

impl Default for InMemoryTipCache {
    fn default() -> Self {
        Self::new(DEFAULT_TIP_TTL)
    }
}

impl ChainTipCache for InMemoryTipCache {
    fn get_tip(&self, tenant: &TenantId) -> Option<ChainTip> {
        let mut inner = self.inner.lock().expect("tip cache lock poisoned");
        match inner.get(tenant) {
            Some((tip, stored_at)) if stored_at.elapsed() < self.ttl => Some(tip.clone()),
            Some(_) => {
                // Expired: drop it so the map does not accumulate dead tips.
                trace!(tenant_id = %tenant, "chain tip expired");
                inner.remove(tenant);
                None
            }
            None => None,
        }
    }

    fn set_tip(&self, tenant: &TenantId, tip: ChainTip) {
        let mut inner = self.inner.lock().expect("tip cache lock poisoned");
        trace!(tenant_id = %tenant, sequence = tip.sequence, "chain tip updated");
        inner.insert(tenant.clone(), (tip, Instant::now()));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tip(hash: &str, sequence: u64) -> ChainTip {
        ChainTip {
            hash: hash.to_string(),
            sequence,
        }
    }

    /// A set tip is readable until its TTL elapses.
    #[test]
    fn set_then_get() {
        let cache = InMemoryTipCache::new(Duration::from_secs(60));
        let tenant = TenantId::new("t1");

        assert!(cache.get_tip(&tenant).is_none());
        cache.set_tip(&tenant, tip("aa", 0));
        assert_eq!(cache.get_tip(&tenant), Some(tip("aa", 0)));
    }

    /// An expired tip reads as absent — never as "chain is empty".
    #[test]
    fn expired_tip_is_absent() {
        let cache = InMemoryTipCache::new(Duration::from_millis(20));
        let tenant = TenantId::new("t1");

        cache.set_tip(&tenant, tip("aa", 0));
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get_tip(&tenant).is_none());
    }

    /// `set_tip` refreshes the TTL for an existing tenant.
    #[test]
    fn set_refreshes_ttl() {
        let cache = InMemoryTipCache::new(Duration::from_millis(150));
        let tenant = TenantId::new("t1");

        cache.set_tip(&tenant, tip("aa", 0));
        std::thread::sleep(Duration::from_millis(100));
        cache.set_tip(&tenant, tip("bb", 1));
        std::thread::sleep(Duration::from_millis(100));

        // 200ms after the first set, but only 100ms after the refresh.
        assert_eq!(cache.get_tip(&tenant), Some(tip("bb", 1)));
    }

    /// Tips are independent per tenant.
    #[test]
    fn tenants_are_isolated() {
        let cache = InMemoryTipCache::default();

        cache.set_tip(&TenantId::new("a"), tip("aa", 3));
        cache.set_tip(&TenantId::new("b"), tip("bb", 7));

        assert_eq!(cache.get_tip(&TenantId::new("a")), Some(tip("aa", 3)));
        assert_eq!(cache.get_tip(&TenantId::new("b")), Some(tip("bb", 7)));
    }

    /// `clear` simulates a cold start.
    #[test]
    fn clear_drops_all_tips() {
        let cache = InMemoryTipCache::default();
        cache.set_tip(&TenantId::new("a"), tip("aa", 0));
        cache.clear();
        assert!(cache.get_tip(&TenantId::new("a")).is_none());
    }
}
