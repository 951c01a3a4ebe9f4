//! `plw subs` handlers.

use anyhow::Result;

pub async fn list(platform: Option<&str>) -> Result<()> {
    let pool = plw_db::connect_from_env().await?;
    let rows = plw_db::list_active_subscriptions(&pool, platform).await?;

    for r in &rows {
        println!(
            "platform={} chat_id={} playlist_id={} updated_at_utc={}",
            r.subscription.subscriber.platform,
            r.subscription.subscriber.chat_id,
            r.subscription.playlist_id,
            r.updated_at_utc.to_rfc3339()
        );
    }
    println!("subscriptions={}", rows.len());
    Ok(())
}
