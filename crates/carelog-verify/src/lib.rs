//! # carelog-verify
//!
//! Chain verification for the CARELOG audit trail.
//!
//! `ChainVerificationService` replays a tenant's hash chain from the durable
//! store and reports integrity breaks — content tampering as
//! `HASH_MISMATCH`, deletion/reordering as `CHAIN_BREAK` — as data in a
//! `VerificationReport`, never as errors.

pub mod service;

pub use service::ChainVerificationService;

// ── Tests ─────────────────────────────────────────────────────────────────────
