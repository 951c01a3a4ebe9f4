//! Durable state boundary.

use plw_schemas::{MembershipSnapshot, PlaylistId, SubscriberKey, Subscription};
use sqlx::PgPool;

use crate::StoreError;

/// Durable storage for subscriptions and their last-known membership.
///
/// Writes are upserts scoped to one key. `save_snapshot` must replace the id
/// set and the metadata map together or not at all.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    async fn load_subscription(&self, key: &SubscriberKey)
        -> Result<Option<Subscription>, StoreError>;

    async fn save_subscription(&self, sub: &Subscription) -> Result<(), StoreError>;

    /// Delete the subscription and every snapshot stored for the subscriber.
    /// Returns `true` if anything existed.
    async fn delete_subscription(&self, key: &SubscriberKey) -> Result<bool, StoreError>;

    async fn list_active_subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;

    async fn load_snapshot(
        &self,
        key: &SubscriberKey,
        playlist: &PlaylistId,
    ) -> Result<Option<MembershipSnapshot>, StoreError>;

    async fn save_snapshot(
        &self,
        key: &SubscriberKey,
        playlist: &PlaylistId,
        snapshot: &MembershipSnapshot,
    ) -> Result<(), StoreError>;

    async fn delete_snapshot(
        &self,
        key: &SubscriberKey,
        playlist: &PlaylistId,
    ) -> Result<bool, StoreError>;
}

/// [`StateStore`] backed by the plw-db Postgres schema.
#[derive(Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl StateStore for PgStateStore {
    async fn load_subscription(
        &self,
        key: &SubscriberKey,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(plw_db::fetch_subscription(&self.pool, key).await?)
    }

    async fn save_subscription(&self, sub: &Subscription) -> Result<(), StoreError> {
        Ok(plw_db::upsert_subscription(&self.pool, sub).await?)
    }

    async fn delete_subscription(&self, key: &SubscriberKey) -> Result<bool, StoreError> {
        Ok(plw_db::delete_subscription(&self.pool, key).await?)
    }

    async fn list_active_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        let rows = plw_db::list_active_subscriptions(&self.pool, None).await?;
        Ok(rows.into_iter().map(|r| r.subscription).collect())
    }

    async fn load_snapshot(
        &self,
        key: &SubscriberKey,
        playlist: &PlaylistId,
    ) -> Result<Option<MembershipSnapshot>, StoreError> {
        Ok(plw_db::load_snapshot(&self.pool, key, playlist).await?)
    }

    async fn save_snapshot(
        &self,
        key: &SubscriberKey,
        playlist: &PlaylistId,
        snapshot: &MembershipSnapshot,
    ) -> Result<(), StoreError> {
        Ok(plw_db::save_snapshot(&self.pool, key, playlist, snapshot).await?)
    }

    async fn delete_snapshot(
        &self,
        key: &SubscriberKey,
        playlist: &PlaylistId,
    ) -> Result<bool, StoreError> {
        Ok(plw_db::delete_snapshot(&self.pool, key, playlist).await?)
    }
}
