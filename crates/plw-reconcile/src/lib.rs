//! plw-reconcile
//!
//! Membership diff engine.
//!
//! - Previous snapshot vs freshly fetched membership, compared as sets.
//! - Added tracks carry metadata from the current fetch.
//! - Removed tracks carry metadata from the previous snapshot.
//! - A subscription with no previous snapshot produces a baseline, not a flood
//!   of "added" events.
//!
//! Deterministic, pure logic. No IO. No catalog calls.

mod engine;
mod types;

pub use engine::{baseline, is_unchanged, reconcile_membership};
pub use types::*;
