//! Command handler modules for plw-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod subs;
pub mod track;

use std::sync::Arc;

use anyhow::{Context, Result};
use plw_catalog::{SpotifyCatalog, SpotifyCredentials};
use plw_config::{report_unused_keys, secrets::resolve_secrets, TrackerConfig, UnusedKeyPolicy};
use plw_runtime::{EngineSettings, LogNotifier, PgStateStore, TrackerEngine};

// ---------------------------------------------------------------------------
// config-hash
// ---------------------------------------------------------------------------

/// Merge the given YAML layers, validate them, and print hash + canonical JSON.
/// Unused keys are reported on stderr but do not fail the command.
pub fn config_hash(paths: &[String]) -> Result<()> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = plw_config::load_layered_yaml(&path_refs)?;
    TrackerConfig::from_loaded(&loaded)?;

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        eprintln!(
            "WARN: CONFIG_UNUSED_KEYS unused_leaf_keys={}",
            report.unused_leaf_pointers.len()
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            eprintln!("  unused={}", p);
        }
    }

    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Engine over Postgres and the live catalog. Changes go to the log only.
pub async fn live_engine() -> Result<TrackerEngine> {
    let loaded = plw_config::load_from_env().context("config load failed")?;
    let cfg = TrackerConfig::from_loaded(&loaded)?;
    let secrets = resolve_secrets(&cfg)?;

    let pool = plw_db::connect_from_env().await?;

    let catalog = SpotifyCatalog::new_with_base_urls(
        SpotifyCredentials {
            client_id: secrets.spotify_client_id,
            client_secret: secrets.spotify_client_secret,
            refresh_token: secrets.spotify_refresh_token,
        },
        cfg.catalog.api_base_url.clone(),
        cfg.catalog.accounts_base_url.clone(),
    )
    .with_page_limit(cfg.catalog.page_limit);

    Ok(TrackerEngine::new(
        Arc::new(catalog),
        Arc::new(PgStateStore::new(pool)),
        Arc::new(LogNotifier),
        EngineSettings {
            fetch_timeout: cfg.reconcile_timeout(),
            notify_timeout: cfg.notify_timeout(),
        },
    ))
}
