//! Scenario: a pass either commits and notifies, or changes nothing.
//!
//! # Invariants under test
//! 1. Catalog failure: error surfaced, snapshot untouched, no events.
//! 2. Fetch timeout: Transient, snapshot untouched, no events.
//! 3. Store write failure: error surfaced, no events delivered, and the
//!    change is reported exactly once after the store recovers.

use std::time::Duration;

use plw_catalog::CatalogError;
use plw_runtime::TrackerError;
use plw_schemas::{PlaylistId, SubscriberKey};
use plw_testkit::{membership_of, Harness};

fn pid(s: &str) -> PlaylistId {
    PlaylistId::parse(s).unwrap()
}

async fn tracked(h: &Harness, chat: &SubscriberKey, id: &str, ids: &[&str]) -> PlaylistId {
    let playlist = pid(id);
    h.catalog.set_membership(&playlist, membership_of(ids));
    h.engine.set_tracking(chat, id).await.unwrap();
    playlist
}

#[tokio::test]
async fn catalog_failure_leaves_snapshot_untouched() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(300);
    let playlist = tracked(&h, &chat, "fails", &["a", "b"]).await;
    let before = h.store.snapshot(&chat, &playlist);
    let writes = h.store.snapshot_writes();

    h.catalog.fail_membership(
        &playlist,
        CatalogError::Transient("page 2: status=503".to_string()),
    );
    let err = h.engine.reconcile(&chat, &playlist).await.unwrap_err();

    assert!(matches!(err, TrackerError::Transient(_)), "got {err}");
    assert_eq!(h.store.snapshot(&chat, &playlist), before);
    assert_eq!(h.store.snapshot_writes(), writes);
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn slow_fetch_times_out_as_transient() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(301);
    let playlist = tracked(&h, &chat, "slow", &["a"]).await;

    h.catalog
        .set_membership(&playlist, membership_of(&["a", "b"]));
    h.catalog
        .set_delay(Some(Harness::FETCH_TIMEOUT + Duration::from_millis(200)));

    let err = h.engine.reconcile(&chat, &playlist).await.unwrap_err();
    assert!(matches!(err, TrackerError::Transient(ref m) if m.contains("timed out")));
    assert_eq!(h.store.snapshot(&chat, &playlist).unwrap().len(), 1);
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn store_failure_blocks_delivery_until_recovery() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(302);
    let playlist = tracked(&h, &chat, "storefail", &["a"]).await;

    h.catalog
        .set_membership(&playlist, membership_of(&["a", "b"]));
    h.store.set_fail_writes(true);
    let err = h.engine.reconcile(&chat, &playlist).await.unwrap_err();
    assert!(matches!(err, TrackerError::Store(_)), "got {err}");
    assert!(h.notifier.events().is_empty());

    h.store.set_fail_writes(false);
    let events = h.engine.reconcile(&chat, &playlist).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].track_id, "b");

    let again = h.engine.reconcile(&chat, &playlist).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(h.notifier.events().len(), 1);
}
