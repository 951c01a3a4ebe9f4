//! Per-subscriber async mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use plw_schemas::SubscriberKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One `tokio::sync::Mutex<()>` per subscriber, created on first use.
///
/// The guard is held across `.await` points, so fetch, diff and commit for
/// one subscriber never interleave with another operation on the same
/// subscriber. Different subscribers never contend.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    table: Mutex<HashMap<SubscriberKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &SubscriberKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut table = self.table.lock().await;
            Arc::clone(
                table
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        slot.lock_owned().await
    }

    /// Number of subscribers that have ever been locked.
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.is_empty()
    }
}
