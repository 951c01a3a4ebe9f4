//! Scenario: starting to track a playlist never floods the chat.
//!
//! # Invariants under test
//! 1. `set_tracking` on a playlist with N tracks emits zero events and
//!    records a baseline of N.
//! 2. A reconcile right after, with no upstream change, emits nothing
//!    (idempotence), and so does every further one.
//! 3. Status reflects the baseline size.

use plw_runtime::TrackingStatus;
use plw_schemas::{PlaylistId, SubscriberKey};
use plw_testkit::{membership_of, Harness};

fn pid(s: &str) -> PlaylistId {
    PlaylistId::parse(s).unwrap()
}

#[tokio::test]
async fn set_tracking_records_baseline_without_events() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(100);
    let playlist = pid("road");
    h.catalog
        .set_membership(&playlist, membership_of(&["a", "b", "c", "d", "e"]));

    let started = h
        .engine
        .set_tracking(&chat, "https://open.spotify.com/playlist/road?si=xyz")
        .await
        .unwrap();

    assert_eq!(started.baseline_size, 5);
    assert_eq!(started.playlist.playlist_id, playlist);
    assert!(h.notifier.events().is_empty());
    assert_eq!(h.store.snapshot(&chat, &playlist).unwrap().len(), 5);
    assert_eq!(h.store.subscription(&chat), Some(playlist.clone()));

    let status = h.engine.get_status(&chat).await.unwrap();
    assert_eq!(
        status,
        TrackingStatus::Tracking {
            playlist_id: playlist,
            track_count: 5
        }
    );
}

#[tokio::test]
async fn repeated_reconcile_without_change_is_silent() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(101);
    let playlist = pid("steady");
    h.catalog
        .set_membership(&playlist, membership_of(&["x", "y"]));
    h.engine.set_tracking(&chat, "steady").await.unwrap();

    for _ in 0..3 {
        let events = h.engine.reconcile(&chat, &playlist).await.unwrap();
        assert!(events.is_empty());
    }
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn missing_snapshot_on_reconcile_is_a_silent_baseline() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(102);
    let playlist = pid("legacy");
    // Subscription exists but no snapshot was ever stored.
    h.store.seed_subscription(&chat, &playlist);
    h.catalog
        .set_membership(&playlist, membership_of(&["a", "b"]));

    let events = h.engine.reconcile(&chat, &playlist).await.unwrap();
    assert!(events.is_empty());
    assert_eq!(h.store.snapshot(&chat, &playlist).unwrap().len(), 2);
}

#[tokio::test]
async fn stored_empty_snapshot_reports_all_tracks_as_added() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(103);
    let playlist = pid("grows");
    h.catalog.set_membership(&playlist, membership_of(&[]));
    h.engine.set_tracking(&chat, "grows").await.unwrap();

    h.catalog
        .set_membership(&playlist, membership_of(&["n1", "n2"]));
    let events = h.engine.reconcile(&chat, &playlist).await.unwrap();
    assert_eq!(events.len(), 2);
}
