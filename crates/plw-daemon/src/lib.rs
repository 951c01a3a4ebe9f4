//! plw-daemon library target.
//!
//! Exposes the router, state, chat transport and message rendering for
//! integration tests. The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod commands;
pub mod format;
pub mod notifier;
pub mod routes;
pub mod state;
pub mod telegram;
