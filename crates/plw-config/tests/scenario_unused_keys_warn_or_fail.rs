//! Unused-key reporting.
//!
//! Keys outside the sections the tracker reads are almost always typos
//! (`trackr:` instead of `tracker:`). `Warn` returns the report, `Fail`
//! turns it into CONFIG_UNUSED_KEYS.

use plw_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const CLEAN: &str = r#"
tracker:
  check_interval_secs: 60
daemon:
  addr: "127.0.0.1:9000"
"#;

const WITH_TYPO: &str = r#"
tracker:
  check_interval_secs: 60
trackr:
  check_interval_secs: 5
extra:
  nested:
    flag: true
"#;

#[test]
fn clean_config_has_no_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[CLEAN]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}

#[test]
fn warn_policy_returns_sorted_unused_leaves() {
    let loaded = load_layered_yaml_from_strings(&[WITH_TYPO]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/extra/nested/flag".to_string(),
            "/trackr/check_interval_secs".to_string()
        ]
    );
    assert!(report
        .consumed_prefixes
        .contains(&"/tracker".to_string()));
}

#[test]
fn fail_policy_errors_and_names_offenders() {
    let loaded = load_layered_yaml_from_strings(&[WITH_TYPO]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_UNUSED_KEYS"));
    assert!(msg.contains("/trackr/check_interval_secs"));
}

#[test]
fn empty_config_is_clean() {
    let loaded = load_layered_yaml_from_strings(&[]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
