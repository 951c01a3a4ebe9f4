//! Process-local, write-through view of subscriptions.

use std::collections::HashMap;

use plw_schemas::{MembershipSnapshot, PlaylistId, SubscriberKey};
use tokio::sync::RwLock;

/// One cached subscription and the snapshot last committed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSubscription {
    pub playlist_id: PlaylistId,
    pub snapshot: MembershipSnapshot,
}

/// subscriber -> (playlist, last committed snapshot).
///
/// Entries are only written after the store accepted the same data, so a
/// cold cache can always be rebuilt from the store.
#[derive(Debug, Default)]
pub struct SubscriptionCache {
    entries: RwLock<HashMap<SubscriberKey, CachedSubscription>>,
}

impl SubscriptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &SubscriberKey) -> Option<CachedSubscription> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn put(&self, key: SubscriberKey, playlist_id: PlaylistId, snapshot: MembershipSnapshot) {
        self.entries.write().await.insert(
            key,
            CachedSubscription {
                playlist_id,
                snapshot,
            },
        );
    }

    pub async fn remove(&self, key: &SubscriberKey) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
