//! Typed view over the merged config JSON.
//!
//! Every field has a default, so an empty config yields a working tracker
//! pointed at the public Spotify / Telegram endpoints.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::LoadedConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrackerConfig {
    pub tracker: TrackerSection,
    pub catalog: CatalogSection,
    pub telegram: TelegramSection,
    pub daemon: DaemonSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSection {
    /// Platform tag stored with every subscription.
    pub platform: String,
    pub check_interval_secs: u64,
    /// Delay before the first scheduled cycle after boot.
    pub initial_delay_secs: u64,
    /// Upper bound on one subscription's fetch phase.
    pub reconcile_timeout_secs: u64,
    /// Upper bound on delivering one change notification.
    pub notify_timeout_secs: u64,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            platform: "telegram".to_string(),
            check_interval_secs: 120,
            initial_delay_secs: 10,
            reconcile_timeout_secs: 60,
            notify_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    pub api_base_url: String,
    pub accounts_base_url: String,
    /// Items per page when listing playlist tracks (Spotify max: 100).
    pub page_limit: u32,
    pub keys_env: CatalogKeysEnv,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.spotify.com".to_string(),
            accounts_base_url: "https://accounts.spotify.com".to_string(),
            page_limit: 100,
            keys_env: CatalogKeysEnv::default(),
        }
    }
}

/// Env var NAMES for catalog credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogKeysEnv {
    pub client_id: String,
    pub client_secret: String,
    /// JSON token cache (must carry `refresh_token` to read private playlists).
    pub token_data: String,
}

impl Default for CatalogKeysEnv {
    fn default() -> Self {
        Self {
            client_id: "SPOTIFY_CLIENT_ID".to_string(),
            client_secret: "SPOTIFY_CLIENT_SECRET".to_string(),
            token_data: "SPOTIFY_TOKEN_DATA".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub api_base_url: String,
    /// Long-poll timeout passed to getUpdates.
    pub poll_timeout_secs: u64,
    /// Request timeout for sendMessage / sendPhoto / editMessageText.
    pub send_timeout_secs: u64,
    pub keys_env: TelegramKeysEnv,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
            send_timeout_secs: 20,
            keys_env: TelegramKeysEnv::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramKeysEnv {
    pub bot_token: String,
}

impl Default for TelegramKeysEnv {
    fn default() -> Self {
        Self {
            bot_token: "TELEGRAM_BOT_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSection {
    pub addr: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let cfg: TrackerConfig = serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the tracker schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracker.platform.trim().is_empty() {
            bail!("CONFIG_INVALID: /tracker/platform must not be empty");
        }
        if self.tracker.check_interval_secs == 0 {
            bail!("CONFIG_INVALID: /tracker/check_interval_secs must be > 0");
        }
        if self.tracker.reconcile_timeout_secs == 0 {
            bail!("CONFIG_INVALID: /tracker/reconcile_timeout_secs must be > 0");
        }
        if self.tracker.notify_timeout_secs == 0 {
            bail!("CONFIG_INVALID: /tracker/notify_timeout_secs must be > 0");
        }
        if self.telegram.send_timeout_secs == 0 {
            bail!("CONFIG_INVALID: /telegram/send_timeout_secs must be > 0");
        }
        if !(1..=100).contains(&self.catalog.page_limit) {
            bail!(
                "CONFIG_INVALID: /catalog/page_limit must be within 1..=100, got {}",
                self.catalog.page_limit
            );
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.tracker.check_interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.tracker.initial_delay_secs)
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.tracker.reconcile_timeout_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.tracker.notify_timeout_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram.send_timeout_secs)
    }
}
