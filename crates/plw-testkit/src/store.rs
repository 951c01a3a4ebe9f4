use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use plw_runtime::{StateStore, StoreError};
use plw_schemas::{MembershipSnapshot, PlaylistId, SubscriberKey, Subscription};

#[derive(Default)]
struct Tables {
    subscriptions: BTreeMap<SubscriberKey, PlaylistId>,
    snapshots: BTreeMap<(SubscriberKey, PlaylistId), MembershipSnapshot>,
}

/// [`StateStore`] over two in-memory maps, with write/read failure injection.
#[derive(Default)]
pub struct MemoryStateStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_snapshot_deletes: AtomicBool,
    snapshot_writes: AtomicUsize,
    subscription_reads: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// While set, every mutating call fails without changing anything.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// While set, only `delete_snapshot` fails.
    pub fn set_fail_snapshot_deletes(&self, fail: bool) {
        self.fail_snapshot_deletes.store(fail, Ordering::SeqCst);
    }

    /// `load_subscription` calls so far, failed ones included.
    pub fn subscription_reads(&self) -> usize {
        self.subscription_reads.load(Ordering::SeqCst)
    }

    /// Successful `save_snapshot` calls so far.
    pub fn snapshot_writes(&self) -> usize {
        self.snapshot_writes.load(Ordering::SeqCst)
    }

    pub fn seed_subscription(&self, key: &SubscriberKey, playlist: &PlaylistId) {
        self.tables()
            .subscriptions
            .insert(key.clone(), playlist.clone());
    }

    pub fn seed_snapshot(
        &self,
        key: &SubscriberKey,
        playlist: &PlaylistId,
        snapshot: MembershipSnapshot,
    ) {
        self.tables()
            .snapshots
            .insert((key.clone(), playlist.clone()), snapshot);
    }

    pub fn snapshot(&self, key: &SubscriberKey, playlist: &PlaylistId) -> Option<MembershipSnapshot> {
        self.tables()
            .snapshots
            .get(&(key.clone(), playlist.clone()))
            .cloned()
    }

    pub fn subscription(&self, key: &SubscriberKey) -> Option<PlaylistId> {
        self.tables().subscriptions.get(key).cloned()
    }

    pub fn snapshot_count(&self) -> usize {
        self.tables().snapshots.len()
    }

    fn check_write(&self, op: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::new(format!("{op}: injected write failure")));
        }
        Ok(())
    }

    fn check_read(&self, op: &str) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::new(format!("{op}: injected read failure")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StateStore for MemoryStateStore {
    async fn load_subscription(
        &self,
        key: &SubscriberKey,
    ) -> Result<Option<Subscription>, StoreError> {
        self.subscription_reads.fetch_add(1, Ordering::SeqCst);
        self.check_read("load_subscription")?;
        Ok(self
            .tables()
            .subscriptions
            .get(key)
            .map(|p| Subscription::new(key.clone(), p.clone())))
    }

    async fn save_subscription(&self, sub: &Subscription) -> Result<(), StoreError> {
        self.check_write("save_subscription")?;
        self.tables()
            .subscriptions
            .insert(sub.subscriber.clone(), sub.playlist_id.clone());
        Ok(())
    }

    async fn delete_subscription(&self, key: &SubscriberKey) -> Result<bool, StoreError> {
        self.check_write("delete_subscription")?;
        let mut t = self.tables();
        let had_sub = t.subscriptions.remove(key).is_some();
        let before = t.snapshots.len();
        t.snapshots.retain(|(k, _), _| k != key);
        Ok(had_sub || t.snapshots.len() != before)
    }

    async fn list_active_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        self.check_read("list_active_subscriptions")?;
        Ok(self
            .tables()
            .subscriptions
            .iter()
            .map(|(k, p)| Subscription::new(k.clone(), p.clone()))
            .collect())
    }

    async fn load_snapshot(
        &self,
        key: &SubscriberKey,
        playlist: &PlaylistId,
    ) -> Result<Option<MembershipSnapshot>, StoreError> {
        self.check_read("load_snapshot")?;
        Ok(self.snapshot(key, playlist))
    }

    async fn save_snapshot(
        &self,
        key: &SubscriberKey,
        playlist: &PlaylistId,
        snapshot: &MembershipSnapshot,
    ) -> Result<(), StoreError> {
        self.check_write("save_snapshot")?;
        self.seed_snapshot(key, playlist, snapshot.clone());
        self.snapshot_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_snapshot(
        &self,
        key: &SubscriberKey,
        playlist: &PlaylistId,
    ) -> Result<bool, StoreError> {
        self.check_write("delete_snapshot")?;
        if self.fail_snapshot_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::new("delete_snapshot: injected failure"));
        }
        Ok(self
            .tables()
            .snapshots
            .remove(&(key.clone(), playlist.clone()))
            .is_some())
    }
}
