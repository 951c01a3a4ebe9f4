//! Scenario: `plw config-hash` merges layers deterministically.
//!
//! # Invariants under test
//! 1. Output carries `config_hash=` and the canonical JSON with later layers
//!    overriding earlier ones.
//! 2. The hash does not depend on key order within a layer.
//! 3. Invalid settings fail the command; unknown keys only warn.

use std::fs;

use predicates::prelude::*;

fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write yaml");
    path.to_string_lossy().into_owned()
}

#[allow(deprecated)]
fn run(paths: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = assert_cmd::Command::cargo_bin("plw").expect("binary builds");
    cmd.arg("config-hash").args(paths);
    cmd.assert()
}

fn hash_line(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .lines()
        .find(|l| l.starts_with("config_hash="))
        .expect("config_hash line")
        .to_string()
}

#[test]
fn later_layer_overrides_earlier() {
    let dir = tempfile::tempdir().unwrap();
    let base = write(
        &dir,
        "base.yaml",
        "tracker:\n  check_interval_secs: 120\n  platform: telegram\n",
    );
    let local = write(&dir, "local.yaml", "tracker:\n  check_interval_secs: 30\n");

    run(&[&base, &local])
        .success()
        .stdout(predicate::str::contains("config_hash="))
        .stdout(predicate::str::contains("\"check_interval_secs\":30"))
        .stdout(predicate::str::contains("\"platform\":\"telegram\""));
}

#[test]
fn hash_ignores_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(
        &dir,
        "a.yaml",
        "tracker:\n  platform: telegram\n  check_interval_secs: 60\n",
    );
    let b = write(
        &dir,
        "b.yaml",
        "tracker:\n  check_interval_secs: 60\n  platform: telegram\n",
    );

    let out_a = run(&[&a]).success().get_output().stdout.clone();
    let out_b = run(&[&b]).success().get_output().stdout.clone();
    assert_eq!(hash_line(&out_a), hash_line(&out_b));
}

#[test]
fn zero_interval_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write(&dir, "bad.yaml", "tracker:\n  check_interval_secs: 0\n");

    run(&[&bad])
        .failure()
        .stderr(predicate::str::contains("check_interval_secs must be > 0"));
}

#[test]
fn unknown_keys_warn_but_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let typo = write(&dir, "typo.yaml", "trackr:\n  check_interval_secs: 60\n");

    run(&[&typo])
        .success()
        .stderr(predicate::str::contains("unused=/trackr/check_interval_secs"));
}

#[test]
fn missing_file_fails() {
    run(&["/definitely/not/here.yaml"])
        .failure()
        .stderr(predicate::str::contains("failed to read yaml path"));
}
