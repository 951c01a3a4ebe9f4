//! plw-db
//!
//! Postgres persistence for subscriptions and membership snapshots.
//!
//! Keys:
//! - `subscriptions`: (platform, chat_id), one row per subscriber
//! - `playlist_snapshots`: (platform, chat_id, playlist_id)
//!
//! Writes are upserts scoped to a single key. A snapshot's id set and its
//! metadata map are stored in the same row, so one statement replaces both.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use plw_schemas::{MembershipSnapshot, PlaylistId, SubscriberKey, Subscription, TrackMeta};
use sqlx::Row;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub const ENV_DB_URL: &str = "PLW_DATABASE_URL";

/// Connect to Postgres using PLW_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_subscriptions_table: bool,
    pub has_snapshots_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_subscriptions_table: table_exists(pool, "subscriptions").await?,
        has_snapshots_table: table_exists(pool, "playlist_snapshots").await?,
    })
}

async fn table_exists(pool: &PgPool, table: &str) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = $1
        )
        "#,
    )
    .bind(table)
    .fetch_one(pool)
    .await
    .with_context(|| format!("status table-exists query failed: {table}"))?;
    Ok(exists)
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SubscriptionRow {
    pub subscription: Subscription,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// Insert or replace the subscriber's tracked playlist.
pub async fn upsert_subscription(pool: &PgPool, sub: &Subscription) -> Result<()> {
    sqlx::query(
        r#"
        insert into subscriptions (platform, chat_id, playlist_id)
        values ($1, $2, $3)
        on conflict (platform, chat_id)
        do update set playlist_id = excluded.playlist_id,
                      updated_at_utc = now()
        "#,
    )
    .bind(&sub.subscriber.platform)
    .bind(sub.subscriber.chat_id)
    .bind(sub.playlist_id.as_str())
    .execute(pool)
    .await
    .context("upsert_subscription failed")?;

    Ok(())
}

pub async fn fetch_subscription(pool: &PgPool, key: &SubscriberKey) -> Result<Option<Subscription>> {
    let row = sqlx::query(
        r#"
        select platform, chat_id, playlist_id, created_at_utc, updated_at_utc
        from subscriptions
        where platform = $1 and chat_id = $2
        "#,
    )
    .bind(&key.platform)
    .bind(key.chat_id)
    .fetch_optional(pool)
    .await
    .context("fetch_subscription failed")?;

    match row {
        Some(r) => Ok(Some(subscription_row(&r)?.subscription)),
        None => Ok(None),
    }
}

/// All subscriptions, optionally filtered by platform, ordered by key.
pub async fn list_active_subscriptions(
    pool: &PgPool,
    platform: Option<&str>,
) -> Result<Vec<SubscriptionRow>> {
    let rows = sqlx::query(
        r#"
        select platform, chat_id, playlist_id, created_at_utc, updated_at_utc
        from subscriptions
        where ($1::text is null or platform = $1)
        order by platform asc, chat_id asc
        "#,
    )
    .bind(platform)
    .fetch_all(pool)
    .await
    .context("list_active_subscriptions failed")?;

    rows.iter().map(subscription_row).collect()
}

fn subscription_row(row: &sqlx::postgres::PgRow) -> Result<SubscriptionRow> {
    let platform: String = row.try_get("platform")?;
    let chat_id: i64 = row.try_get("chat_id")?;
    let raw_playlist: String = row.try_get("playlist_id")?;
    let playlist_id = PlaylistId::parse(&raw_playlist)
        .with_context(|| format!("corrupt playlist_id in subscriptions row {platform}:{chat_id}"))?;

    Ok(SubscriptionRow {
        subscription: Subscription::new(SubscriberKey::new(platform, chat_id), playlist_id),
        created_at_utc: row.try_get("created_at_utc")?,
        updated_at_utc: row.try_get("updated_at_utc")?,
    })
}

/// Remove the subscriber's subscription and every snapshot stored for it, in
/// one transaction. Returns `true` if anything was deleted.
pub async fn delete_subscription(pool: &PgPool, key: &SubscriberKey) -> Result<bool> {
    let mut tx = pool
        .begin()
        .await
        .context("delete_subscription begin failed")?;

    let subs = sqlx::query("delete from subscriptions where platform = $1 and chat_id = $2")
        .bind(&key.platform)
        .bind(key.chat_id)
        .execute(&mut *tx)
        .await
        .context("delete_subscription (subscriptions) failed")?;

    let snaps = sqlx::query("delete from playlist_snapshots where platform = $1 and chat_id = $2")
        .bind(&key.platform)
        .bind(key.chat_id)
        .execute(&mut *tx)
        .await
        .context("delete_subscription (playlist_snapshots) failed")?;

    tx.commit()
        .await
        .context("delete_subscription commit failed")?;

    Ok(subs.rows_affected() + snaps.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

pub async fn load_snapshot(
    pool: &PgPool,
    key: &SubscriberKey,
    playlist: &PlaylistId,
) -> Result<Option<MembershipSnapshot>> {
    let row = sqlx::query(
        r#"
        select track_ids, track_data
        from playlist_snapshots
        where platform = $1 and chat_id = $2 and playlist_id = $3
        "#,
    )
    .bind(&key.platform)
    .bind(key.chat_id)
    .bind(playlist.as_str())
    .fetch_optional(pool)
    .await
    .context("load_snapshot failed")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let ids_json: serde_json::Value = row.try_get("track_ids")?;
    let data_json: serde_json::Value = row.try_get("track_data")?;

    let track_ids: BTreeSet<String> =
        serde_json::from_value(ids_json).context("load_snapshot: track_ids decode failed")?;
    let track_data: BTreeMap<String, TrackMeta> =
        serde_json::from_value(data_json).context("load_snapshot: track_data decode failed")?;

    Ok(Some(MembershipSnapshot {
        track_ids,
        track_data,
    }))
}

/// Replace the stored snapshot (ids + metadata) in a single upsert.
pub async fn save_snapshot(
    pool: &PgPool,
    key: &SubscriberKey,
    playlist: &PlaylistId,
    snapshot: &MembershipSnapshot,
) -> Result<()> {
    let ids_json =
        serde_json::to_value(&snapshot.track_ids).context("save_snapshot: track_ids encode")?;
    let data_json =
        serde_json::to_value(&snapshot.track_data).context("save_snapshot: track_data encode")?;

    sqlx::query(
        r#"
        insert into playlist_snapshots (platform, chat_id, playlist_id, track_ids, track_data)
        values ($1, $2, $3, $4, $5)
        on conflict (platform, chat_id, playlist_id)
        do update set track_ids = excluded.track_ids,
                      track_data = excluded.track_data,
                      last_updated_utc = now()
        "#,
    )
    .bind(&key.platform)
    .bind(key.chat_id)
    .bind(playlist.as_str())
    .bind(ids_json)
    .bind(data_json)
    .execute(pool)
    .await
    .context("save_snapshot failed")?;

    Ok(())
}

pub async fn delete_snapshot(
    pool: &PgPool,
    key: &SubscriberKey,
    playlist: &PlaylistId,
) -> Result<bool> {
    let res = sqlx::query(
        "delete from playlist_snapshots where platform = $1 and chat_id = $2 and playlist_id = $3",
    )
    .bind(&key.platform)
    .bind(key.chat_id)
    .bind(playlist.as_str())
    .execute(pool)
    .await
    .context("delete_snapshot failed")?;

    Ok(res.rows_affected() > 0)
}
