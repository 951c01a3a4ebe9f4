//! `plw track` handlers.
//!
//! `set` and `check` go through the engine so they take the same per-chat
//! lock path as the daemon would. `stop` and `status` only touch the store.

use anyhow::Result;
use plw_schemas::{PlaylistId, SubscriberKey};

use super::live_engine;

// ---------------------------------------------------------------------------
// track set
// ---------------------------------------------------------------------------

pub async fn set(platform: &str, chat_id: i64, reference: &str) -> Result<()> {
    // Reject bad input before touching config, network or DB.
    PlaylistId::parse(reference)?;

    let engine = live_engine().await?;
    let key = SubscriberKey::new(platform, chat_id);
    let started = engine.set_tracking(&key, reference).await?;

    println!("subscriber={}", key);
    println!("playlist_id={}", started.playlist.playlist_id);
    println!("playlist_name={}", started.playlist.name);
    println!("baseline_size={}", started.baseline_size);
    Ok(())
}

// ---------------------------------------------------------------------------
// track stop
// ---------------------------------------------------------------------------

pub async fn stop(platform: &str, chat_id: i64) -> Result<()> {
    let pool = plw_db::connect_from_env().await?;
    let key = SubscriberKey::new(platform, chat_id);
    let removed = plw_db::delete_subscription(&pool, &key).await?;
    println!("stopped=true subscriber={} removed={}", key, removed);
    Ok(())
}

// ---------------------------------------------------------------------------
// track status
// ---------------------------------------------------------------------------

pub async fn status(platform: &str, chat_id: i64) -> Result<()> {
    let pool = plw_db::connect_from_env().await?;
    let key = SubscriberKey::new(platform, chat_id);

    let Some(sub) = plw_db::fetch_subscription(&pool, &key).await? else {
        println!("subscriber={} tracking=false", key);
        return Ok(());
    };

    let snapshot = plw_db::load_snapshot(&pool, &key, &sub.playlist_id).await?;
    println!("subscriber={} tracking=true", key);
    println!("playlist_id={}", sub.playlist_id);
    println!("playlist_url={}", sub.playlist_id.share_url());
    match snapshot {
        Some(s) => println!("track_count={}", s.len()),
        None => println!("track_count=NONE"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// track check
// ---------------------------------------------------------------------------

pub async fn check(platform: &str, chat_id: i64) -> Result<()> {
    let engine = live_engine().await?;
    let key = SubscriberKey::new(platform, chat_id);

    let Some(events) = engine.check_now(&key).await? else {
        println!("subscriber={} tracking=false", key);
        return Ok(());
    };

    for e in &events {
        let name = e.meta.as_ref().map(|m| m.name.as_str()).unwrap_or("-");
        println!("event={} track_id={} name={}", e.kind.as_str(), e.track_id, name);
    }
    println!("subscriber={} events={}", key, events.len());
    Ok(())
}
