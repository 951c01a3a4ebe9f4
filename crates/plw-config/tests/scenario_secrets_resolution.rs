//! Secret resolution from env var names.
//!
//! # Test design
//! Lookups go through `resolve_secrets_with` and a fixed map, so no test
//! mutates the process environment. The one test that uses the real
//! environment points at sentinel names that are never set anywhere.

use std::collections::HashMap;

use plw_config::secrets::{resolve_secrets, resolve_secrets_with};
use plw_config::{load_layered_yaml_from_strings, TrackerConfig};

fn cfg(yaml: &str) -> TrackerConfig {
    let loaded = load_layered_yaml_from_strings(&[yaml]).expect("test yaml must parse cleanly");
    TrackerConfig::from_loaded(&loaded).unwrap()
}

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn resolves_all_values_by_configured_names() {
    let c = cfg("telegram:\n  keys_env:\n    bot_token: \"PLW_TEST_BOT\"\n");
    let s = resolve_secrets_with(
        &c,
        env(&[
            ("SPOTIFY_CLIENT_ID", "id-value"),
            ("SPOTIFY_CLIENT_SECRET", "secret-value"),
            ("SPOTIFY_TOKEN_DATA", r#"{"access_token":"x","refresh_token":"r-value"}"#),
            ("PLW_TEST_BOT", "bot-value"),
        ]),
    )
    .unwrap();
    assert_eq!(s.spotify_client_id, "id-value");
    assert_eq!(s.spotify_client_secret, "secret-value");
    assert_eq!(s.spotify_refresh_token.as_deref(), Some("r-value"));
    assert_eq!(s.telegram_bot_token.as_deref(), Some("bot-value"));
}

#[test]
fn missing_client_id_fails_closed_with_var_name() {
    let c = cfg("catalog:\n  keys_env:\n    client_id: \"PLW_SENTINEL_CLIENT_ID_Q7\"\n");
    let err = resolve_secrets_with(&c, env(&[("SPOTIFY_CLIENT_SECRET", "s")])).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("SECRETS_MISSING"));
    assert!(msg.contains("PLW_SENTINEL_CLIENT_ID_Q7"));
}

#[test]
fn blank_client_secret_counts_as_missing() {
    let c = TrackerConfig::default();
    let err = resolve_secrets_with(
        &c,
        env(&[("SPOTIFY_CLIENT_ID", "id"), ("SPOTIFY_CLIENT_SECRET", "   ")]),
    )
    .unwrap_err();
    assert!(err.to_string().contains("SPOTIFY_CLIENT_SECRET"));
}

#[test]
fn optional_secrets_may_be_absent() {
    let c = TrackerConfig::default();
    let s = resolve_secrets_with(
        &c,
        env(&[("SPOTIFY_CLIENT_ID", "id"), ("SPOTIFY_CLIENT_SECRET", "s")]),
    )
    .unwrap();
    assert!(s.spotify_refresh_token.is_none());
    assert!(s.telegram_bot_token.is_none());
}

#[test]
fn malformed_token_data_errors_without_echoing_value() {
    let c = TrackerConfig::default();
    let err = resolve_secrets_with(
        &c,
        env(&[
            ("SPOTIFY_CLIENT_ID", "id"),
            ("SPOTIFY_CLIENT_SECRET", "s"),
            ("SPOTIFY_TOKEN_DATA", "not-json-but-secret-ish"),
        ]),
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("SECRETS_INVALID"));
    assert!(msg.contains("SPOTIFY_TOKEN_DATA"));
    assert!(!msg.contains("not-json-but-secret-ish"));
}

#[test]
fn debug_output_is_redacted() {
    let c = TrackerConfig::default();
    let s = resolve_secrets_with(
        &c,
        env(&[
            ("SPOTIFY_CLIENT_ID", "visible-id"),
            ("SPOTIFY_CLIENT_SECRET", "visible-secret"),
            ("TELEGRAM_BOT_TOKEN", "visible-bot"),
        ]),
    )
    .unwrap();
    let dbg = format!("{s:?}");
    assert!(dbg.contains("REDACTED"));
    assert!(!dbg.contains("visible"));
}

#[test]
fn real_environment_with_sentinel_names_fails_closed() {
    let c = cfg(r#"
catalog:
  keys_env:
    client_id: "PLW_SENTINEL_UNSET_ID_8F2A"
    client_secret: "PLW_SENTINEL_UNSET_SECRET_8F2A"
"#);
    let err = resolve_secrets(&c).unwrap_err();
    assert!(err.to_string().contains("PLW_SENTINEL_UNSET_ID_8F2A"));
}
