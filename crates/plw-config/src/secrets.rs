//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"SPOTIFY_CLIENT_ID"`).
//! - Binaries call [`resolve_secrets`] once at startup and pass the result into
//!   constructors; no other module reads credentials from the environment.
//! - `Debug` impls **redact** values.
//! - Error messages reference the env var **NAME**, never the value.
//!
//! # Enforcement
//! | Secret | Required |
//! |--------|----------|
//! | Spotify client id / secret | yes |
//! | Spotify token data (JSON with `refresh_token`) | no: falls back to client-credentials (public playlists only) |
//! | Telegram bot token | no: notifications are logged instead of delivered |

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::TrackerConfig;

/// All runtime-resolved secrets for one process.
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    /// Refresh token pulled out of the token-data JSON, if provided.
    pub spotify_refresh_token: Option<String>,
    pub telegram_bot_token: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("spotify_client_id", &"<REDACTED>")
            .field("spotify_client_secret", &"<REDACTED>")
            .field(
                "spotify_refresh_token",
                &self.spotify_refresh_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Subset of the cached OAuth token JSON we care about.
#[derive(Deserialize)]
struct TokenData {
    refresh_token: Option<String>,
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Resolve secrets from the process environment.
pub fn resolve_secrets(cfg: &TrackerConfig) -> Result<ResolvedSecrets> {
    resolve_secrets_with(cfg, |name| std::env::var(name).ok())
}

/// Resolve secrets through `lookup` (env var name -> value).
pub fn resolve_secrets_with<F>(cfg: &TrackerConfig, lookup: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let keys = &cfg.catalog.keys_env;

    let Some(spotify_client_id) = non_blank(lookup(&keys.client_id)) else {
        bail!(
            "SECRETS_MISSING: required env var '{}' (spotify client id) is not set or empty",
            keys.client_id
        );
    };
    let Some(spotify_client_secret) = non_blank(lookup(&keys.client_secret)) else {
        bail!(
            "SECRETS_MISSING: required env var '{}' (spotify client secret) is not set or empty",
            keys.client_secret
        );
    };

    let spotify_refresh_token = match non_blank(lookup(&keys.token_data)) {
        None => None,
        Some(raw) => match serde_json::from_str::<TokenData>(&raw) {
            Ok(td) => non_blank(td.refresh_token),
            Err(_) => bail!(
                "SECRETS_INVALID: env var '{}' (spotify token data) is not valid token JSON",
                keys.token_data
            ),
        },
    };

    let telegram_bot_token = non_blank(lookup(&cfg.telegram.keys_env.bot_token));

    Ok(ResolvedSecrets {
        spotify_client_id,
        spotify_client_secret,
        spotify_refresh_token,
        telegram_bot_token,
    })
}
