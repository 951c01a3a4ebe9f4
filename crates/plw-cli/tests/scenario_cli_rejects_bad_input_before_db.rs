//! Scenario: operator input errors surface before any DB or network work.
//!
//! # Invariants under test
//! 1. `track set` with an unparseable playlist reference fails with a clear
//!    message even when no database is configured.
//! 2. DB-backed commands fail with the missing env var name when
//!    `PLW_DATABASE_URL` is unset.

use predicates::prelude::*;

#[allow(deprecated)]
#[test]
fn track_set_rejects_invalid_playlist_without_db() -> anyhow::Result<()> {
    let mut cmd = assert_cmd::Command::cargo_bin("plw")?;
    cmd.env_remove(plw_db::ENV_DB_URL)
        .args([
            "track",
            "set",
            "--chat-id",
            "42",
            "--playlist",
            "https://example.com/not-a-playlist",
        ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid playlist reference"));
    Ok(())
}

#[allow(deprecated)]
#[test]
fn db_status_without_url_names_the_env_var() -> anyhow::Result<()> {
    let mut cmd = assert_cmd::Command::cargo_bin("plw")?;
    cmd.env_remove(plw_db::ENV_DB_URL).args(["db", "status"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("missing env var PLW_DATABASE_URL"));
    Ok(())
}

#[allow(deprecated)]
#[test]
fn track_status_without_url_fails() -> anyhow::Result<()> {
    let mut cmd = assert_cmd::Command::cargo_bin("plw")?;
    cmd.env_remove(plw_db::ENV_DB_URL)
        .args(["track", "status", "--chat-id", "-1001"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("PLW_DATABASE_URL"));
    Ok(())
}
