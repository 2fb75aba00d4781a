//! The sharded worker pool: per-tenant serialized append processing.
//!
//! A fork — two entries claiming the same previous hash — can only happen if
//! two appends for the same tenant interleave between reading the tip and
//! writing the entry.  The pool prevents this structurally: each tenant is
//! hashed to exactly one shard, each shard is one thread draining one
//! bounded channel, so appends for a given tenant are strictly sequential
//! while different tenants proceed in parallel.
//!
//! Configuring a single shard reproduces the fully conservative variant:
//! one global writer across all tenants.
//!
//! The pool stands in for an external job queue in tests and demos.  A real
//! deployment keeps the same shard-per-tenant discipline at the queue
//! consumer; `AuditAppendWorker::process` is transport-agnostic either way.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use carelog_contracts::{
    entry::TenantId,
    error::{AuditError, AuditResult},
    event::AuditEvent,
};
use carelog_store::{AuditEntryStore, ChainTipCache};

use crate::{config::AuditConfig, worker::AuditAppendWorker};

/// Producer handle for enqueueing audit events.
///
/// Cheap to clone; hand one to every producer.  `enqueue` never waits for
/// chain completion — at most it blocks briefly when the target shard's
/// bounded queue is full (backpressure, not loss).
#[derive(Clone)]
pub struct AuditEventSender {
    shards: Vec<SyncSender<AuditEvent>>,
}

impl AuditEventSender {
    /// Queue one event for its tenant's shard.
    ///
    /// Returns `AuditError::QueueClosed` once the pool has shut down.
    pub fn enqueue(&self, event: AuditEvent) -> AuditResult<()> {
        let shard = shard_for(&event.tenant_id, self.shards.len());
        self.shards[shard]
            .send(event)
            .map_err(|_| AuditError::QueueClosed)
    }
}

/// Hash a tenant into a fixed shard slot.
fn shard_for(tenant: &TenantId, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    tenant.hash(&mut hasher);
    (hasher.finish() as usize) % shards
}

/// A running pool of shard threads, each an exclusive sequential consumer.
pub struct AuditWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl AuditWorkerPool {
    /// Spawn `config.worker_shards` shard threads over the given store and
    /// cache, returning the producer handle and the pool.
    pub fn spawn(
        config: &AuditConfig,
        store: Arc<dyn AuditEntryStore>,
        cache: Arc<dyn ChainTipCache>,
    ) -> (AuditEventSender, AuditWorkerPool) {
        // Configs built by hand can bypass TOML validation; a pool with
        // zero shards could never process anything and would panic on the
        // first enqueue's shard routing.
        let shard_count = config.worker_shards.max(1);
        let mut senders = Vec::with_capacity(shard_count);
        let mut handles = Vec::with_capacity(shard_count);

        for shard in 0..shard_count {
            let (tx, rx) = sync_channel::<AuditEvent>(config.queue_depth);
            senders.push(tx);

            let worker = AuditAppendWorker::new(store.clone(), cache.clone());
            let max_attempts = config.append_max_attempts;
            let backoff = Duration::from_millis(config.append_backoff_ms);

            let handle = thread::Builder::new()
                .name(format!("carelog-audit-{shard}"))
                .spawn(move || shard_loop(shard, rx, worker, max_attempts, backoff))
                .expect("failed to spawn audit shard thread");
            handles.push(handle);
        }

        info!(shards = shard_count, "audit worker pool started");
        (AuditEventSender { shards: senders }, AuditWorkerPool { handles })
    }

    /// Wait for every shard to drain and exit.
    ///
    /// Shards exit when all clones of the `AuditEventSender` have been
    /// dropped and their queues are empty, so drop the sender first.
    pub fn join(self) {
        for handle in self.handles {
            // A panicking shard already aborted its chain work; nothing to
            // salvage here beyond surfacing the panic.
            handle.join().expect("audit shard thread panicked");
        }
    }
}

/// One shard's consume loop: recv → process, with bounded retry.
///
/// Retry handles transient store failures.  An event that still fails after
/// the last attempt is dropped with a warning — the chain simply never
/// advances for it (a trail gap), which is the designed failure mode; a
/// broken link is never produced.
fn shard_loop(
    shard: usize,
    rx: Receiver<AuditEvent>,
    worker: AuditAppendWorker,
    max_attempts: u32,
    backoff: Duration,
) {
    while let Ok(event) = rx.recv() {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match worker.process(event.clone()) {
                Ok(entry) => {
                    debug!(
                        shard,
                        tenant_id = %entry.tenant_id(),
                        sequence = entry.sequence,
                        "audit event processed"
                    );
                    break;
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        shard,
                        tenant_id = %event.tenant_id,
                        attempt,
                        error = %e,
                        "audit append failed; retrying"
                    );
                    thread::sleep(backoff * attempt);
                }
                Err(e) => {
                    warn!(
                        shard,
                        tenant_id = %event.tenant_id,
                        attempts = attempt,
                        error = %e,
                        "audit event dropped after exhausting retries; trail gap"
                    );
                    break;
                }
            }
        }
    }
    debug!(shard, "audit shard drained and stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;

    use carelog_chain::GENESIS_HASH;
    use carelog_contracts::{
        entry::TenantId,
        event::{Actor, AuditCategory, AuditEvent, AuditEventType},
    };
    use carelog_store::{AuditEntryStore, InMemoryAuditStore, InMemoryTipCache};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn make_event(tenant: &str, n: usize) -> AuditEvent {
        AuditEvent {
            tenant_id: TenantId::new(tenant),
            event_type: AuditEventType::PhiAccess,
            category: AuditCategory::Privacy,
            actor: Actor {
                user_id: format!("u-{n}"),
                user_name: "Dr. Okafor".to_string(),
            },
            action: Some(format!("action-{n}")),
            resource: None,
            context: None,
            details: Some(json!({ "n": n })),
            before: None,
            after: None,
            timestamp: Utc::now(),
        }
    }

    fn small_config(shards: usize) -> AuditConfig {
        AuditConfig {
            worker_shards: shards,
            queue_depth: 64,
            ..AuditConfig::default()
        }
    }

    /// Assert a chain is well formed: sequences 0..n, genesis root, linked
    /// hash-to-hash, and no two entries sharing a previous hash.
    fn assert_chain_well_formed(store: &InMemoryAuditStore, tenant: &TenantId, expected_len: usize) {
        let chain = store.chain(tenant).unwrap();
        assert_eq!(chain.len(), expected_len);

        let mut seen_prev: HashSet<String> = HashSet::new();
        let mut expected_prev = GENESIS_HASH.to_string();
        for (i, entry) in chain.iter().enumerate() {
            assert_eq!(entry.sequence, i as u64);
            assert_eq!(entry.prev_hash, expected_prev, "broken link at {i}");
            assert!(
                seen_prev.insert(entry.prev_hash.clone()),
                "fork: duplicate prev_hash at {i}"
            );
            expected_prev = entry.hash.clone();
        }
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    /// 100 events through the pool yield one unbroken 100-entry chain.
    #[test]
    fn hundred_events_single_tenant() {
        let store = Arc::new(InMemoryAuditStore::new());
        let cache = Arc::new(InMemoryTipCache::default());
        let (sender, pool) = AuditWorkerPool::spawn(&small_config(4), store.clone(), cache);

        for n in 0..100 {
            sender.enqueue(make_event("mercy", n)).unwrap();
        }
        drop(sender);
        pool.join();

        assert_chain_well_formed(&store, &TenantId::new("mercy"), 100);
    }

    /// Concurrent producers for the same tenant cannot fork the chain.
    #[test]
    fn no_fork_under_concurrent_producers() {
        let store = Arc::new(InMemoryAuditStore::new());
        let cache = Arc::new(InMemoryTipCache::default());
        let (sender, pool) = AuditWorkerPool::spawn(&small_config(4), store.clone(), cache);

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let sender = sender.clone();
                std::thread::spawn(move || {
                    for n in 0..25 {
                        sender.enqueue(make_event("mercy", p * 25 + n)).unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        drop(sender);
        pool.join();

        assert_chain_well_formed(&store, &TenantId::new("mercy"), 100);
    }

    /// Multiple tenants each end up with their own well-formed chain.
    #[test]
    fn tenants_get_independent_chains() {
        let store = Arc::new(InMemoryAuditStore::new());
        let cache = Arc::new(InMemoryTipCache::default());
        let (sender, pool) = AuditWorkerPool::spawn(&small_config(3), store.clone(), cache);

        for tenant in ["st-lukes", "mercy", "northside"] {
            for n in 0..20 {
                sender.enqueue(make_event(tenant, n)).unwrap();
            }
        }
        drop(sender);
        pool.join();

        for tenant in ["st-lukes", "mercy", "northside"] {
            assert_chain_well_formed(&store, &TenantId::new(tenant), 20);
        }
    }

    /// A single shard reproduces the global single-writer variant.
    #[test]
    fn single_shard_still_serializes() {
        let store = Arc::new(InMemoryAuditStore::new());
        let cache = Arc::new(InMemoryTipCache::default());
        let (sender, pool) = AuditWorkerPool::spawn(&small_config(1), store.clone(), cache);

        for tenant in ["a", "b"] {
            for n in 0..10 {
                sender.enqueue(make_event(tenant, n)).unwrap();
            }
        }
        drop(sender);
        pool.join();

        assert_chain_well_formed(&store, &TenantId::new("a"), 10);
        assert_chain_well_formed(&store, &TenantId::new("b"), 10);
    }

    /// The same tenant always routes to the same shard slot.
    #[test]
    fn shard_routing_is_stable() {
        let tenant = TenantId::new("mercy");
        let first = shard_for(&tenant, 8);
        for _ in 0..10 {
            assert_eq!(shard_for(&tenant, 8), first);
        }
        assert!(first < 8);
    }

    /// A hand-built config with zero shards is clamped to one instead of
    /// panicking on the first enqueue's shard routing.
    #[test]
    fn zero_shard_config_is_clamped() {
        let store = Arc::new(InMemoryAuditStore::new());
        let cache = Arc::new(InMemoryTipCache::default());
        let config = AuditConfig {
            worker_shards: 0,
            queue_depth: 8,
            ..AuditConfig::default()
        };
        let (sender, pool) = AuditWorkerPool::spawn(&config, store.clone(), cache);

        sender.enqueue(make_event("mercy", 0)).unwrap();
        drop(sender);
        pool.join();

        assert_chain_well_formed(&store, &TenantId::new("mercy"), 1);
    }

    /// Enqueueing into a shut-down shard reports a closed queue.
    #[test]
    fn enqueue_into_closed_queue_fails() {
        let (tx, rx) = sync_channel::<AuditEvent>(4);
        drop(rx);

        let sender = AuditEventSender { shards: vec![tx] };
        let err = sender.enqueue(make_event("t1", 0)).unwrap_err();
        assert!(matches!(err, AuditError::QueueClosed));
    }
}
