//! # carelog-contracts
//!
//! Shared types, enums, and error taxonomy for the CARELOG tamper-evident
//! audit trail.
//!
//! All crates in the workspace import from here.  No business logic lives in
//! this crate — only data definitions and error types.

pub mod entry;
pub mod error;
pub mod event;
pub mod report;
