//! Chain verification report types.
//!
//! The verification service replays a tenant's chain and reports every
//! integrity break it finds.  Breaks are findings, not errors: a report with
//! `valid == false` is a successful verification run that found tampering.

use serde::{Deserialize, Serialize};

use crate::entry::{AuditEntryId, TenantId};

/// The kind of integrity violation found at one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakKind {
    /// The entry's stored hash does not match the hash recomputed from its
    /// stored content — the content was altered after the fact.
    #[serde(rename = "HASH_MISMATCH")]
    HashMismatch,

    /// The entry's `prev_hash` (or sequence) does not line up with the
    /// preceding entry — an entry was deleted, reordered, or inserted out
    /// of band.
    #[serde(rename = "CHAIN_BREAK")]
    ChainBreak,
}

impl std::fmt::Display for BreakKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakKind::HashMismatch => f.write_str("HASH_MISMATCH"),
            BreakKind::ChainBreak => f.write_str("CHAIN_BREAK"),
        }
    }
}

/// One integrity break found during verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainBreak {
    /// The entry at which the break was detected.
    pub entry_id: AuditEntryId,
    /// That entry's stored append-order sequence.
    pub sequence: u64,
    /// 1-based position of the entry within the verified window.
    pub position: usize,
    /// What kind of violation this is.
    pub kind: BreakKind,
    /// Human-readable explanation for operators and compliance tooling.
    pub detail: String,
}

/// The result of replaying one tenant's chain (or a window of it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// The tenant whose chain was verified.
    pub tenant_id: TenantId,
    /// True only if no breaks were found.
    pub valid: bool,
    /// How many entries were examined.
    pub entries_checked: usize,
    /// Every break found, in chain order.  Empty when `valid`.
    pub breaks: Vec<ChainBreak>,
    /// Caveat set when the verified window was empty: an empty window is
    /// trivially valid but proves nothing about the rest of the chain.
    pub range_note: Option<String>,
}
