//! plw-runtime
//!
//! Owns the read-diff-write transaction for every subscription.
//!
//! - [`TrackerEngine`] is the only component that mutates membership
//!   snapshots. All of its mutating operations for one subscriber are
//!   serialized by a keyed async lock.
//! - Persistence and delivery sit behind [`StateStore`] and [`Notifier`] so
//!   the engine runs unchanged against Postgres, in-memory fakes, Telegram or
//!   a log sink.
//! - The in-memory [`SubscriptionCache`] is write-through and rebuildable from
//!   the store; it is never authoritative.

mod cache;
mod engine;
mod error;
mod locks;
mod notify;
mod store;

pub use cache::{CachedSubscription, SubscriptionCache};
pub use engine::{CycleReport, EngineSettings, TrackerEngine, TrackingStarted, TrackingStatus};
pub use error::{NotifyError, StoreError, TrackerError};
pub use locks::KeyedLocks;
pub use notify::{LogNotifier, Notifier};
pub use store::{PgStateStore, StateStore};
