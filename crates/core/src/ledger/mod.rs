//! Balance ledger rules.
//!
//! The ledger maps a (resource, unit) pair to a non-negative on-hand
//! quantity. This module holds the pure arithmetic: the delta primitive that
//! every engine reuses, and replay-based reconstruction for audits.

pub mod balance;

pub use balance::{BalanceKey, apply_delta, replay};
