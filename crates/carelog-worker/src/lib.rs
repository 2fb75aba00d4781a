//! # carelog-worker
//!
//! The append side of the CARELOG audit chain: the single-writer
//! `AuditAppendWorker`, the per-tenant sharded `AuditWorkerPool`, and the
//! TOML-loaded `AuditConfig`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use carelog_store::{InMemoryAuditStore, InMemoryTipCache};
//! use carelog_worker::{AuditConfig, AuditWorkerPool};
//!
//! let config = AuditConfig::default();
//! let store = Arc::new(InMemoryAuditStore::new());
//! let cache = Arc::new(InMemoryTipCache::new(config.tip_ttl()));
//!
//! let (sender, pool) = AuditWorkerPool::spawn(&config, store, cache);
//! sender.enqueue(event)?;
//! // …
//! drop(sender);
//! pool.join();
//! ```

pub mod config;
pub mod pool;
pub mod worker;

pub use config::AuditConfig;
pub use pool::{AuditEventSender, AuditWorkerPool};
pub use worker::AuditAppendWorker;
