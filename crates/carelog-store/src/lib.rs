//! # carelog-store
//!
//! Storage boundary of the CARELOG audit trail: the durable, append-only
//! `AuditEntryStore` and the advisory, TTL-bounded `ChainTipCache`, plus
//! in-memory reference implementations of both.
//!
//! The consistency discipline between the two lives in the append worker:
//! the cache is written only after a durable append succeeds, and a cache
//! miss always falls back to the store.  This crate only provides the
//! building blocks and their contracts.

pub mod cache;
pub mod memory;
pub mod traits;

pub use cache::{InMemoryTipCache, DEFAULT_TIP_TTL};
pub use memory::InMemoryAuditStore;
pub use traits::{AuditEntryStore, ChainTipCache};
