//! Scenario: end-to-end diff delivery through the engine.
//!
//! # Invariants under test
//! 1. {A,B,C} -> {B,C,D} delivers Added(D) then Removed(A), and the stored
//!    snapshot becomes {B,C,D}.
//! 2. Removed(A) carries the metadata captured while A was present.
//! 3. Events reach the notifier in the order the engine returns them.
//! 4. A failing notifier does not roll back the commit; the next pass is
//!    silent.

use plw_schemas::{DiffKind, PlaylistId, SubscriberKey};
use plw_testkit::{membership_of, track_meta, Harness};

fn pid(s: &str) -> PlaylistId {
    PlaylistId::parse(s).unwrap()
}

#[tokio::test]
async fn abc_to_bcd_delivers_added_d_and_removed_a() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(200);
    let playlist = pid("abcpl");
    h.catalog
        .set_membership(&playlist, membership_of(&["A", "B", "C"]));
    h.engine.set_tracking(&chat, "abcpl").await.unwrap();

    h.catalog
        .set_membership(&playlist, membership_of(&["B", "C", "D"]));
    let events = h.engine.reconcile(&chat, &playlist).await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, DiffKind::Added);
    assert_eq!(events[0].track_id, "D");
    assert_eq!(events[1].kind, DiffKind::Removed);
    assert_eq!(events[1].track_id, "A");
    assert_eq!(events[1].meta.as_ref(), Some(&track_meta("A")));

    let delivered = h.notifier.delivered();
    assert_eq!(delivered.len(), 2);
    assert!(delivered.iter().all(|(k, _)| k == &chat));
    assert_eq!(h.notifier.events(), events);

    let ids: Vec<String> = h
        .store
        .snapshot(&chat, &playlist)
        .unwrap()
        .track_ids
        .into_iter()
        .collect();
    assert_eq!(ids, vec!["B", "C", "D"]);
}

#[tokio::test]
async fn emptied_playlist_removes_every_track() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(201);
    let playlist = pid("wipe");
    h.catalog
        .set_membership(&playlist, membership_of(&["a", "b", "c"]));
    h.engine.set_tracking(&chat, "wipe").await.unwrap();

    h.catalog.set_membership(&playlist, membership_of(&[]));
    let events = h.engine.reconcile(&chat, &playlist).await.unwrap();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.kind == DiffKind::Removed && e.meta.is_some()));
    assert!(h.store.snapshot(&chat, &playlist).unwrap().is_empty());
}

#[tokio::test]
async fn notifier_failure_keeps_commit() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(202);
    let playlist = pid("flaky");
    h.catalog.set_membership(&playlist, membership_of(&["a"]));
    h.engine.set_tracking(&chat, "flaky").await.unwrap();

    h.notifier.set_fail(true);
    h.catalog
        .set_membership(&playlist, membership_of(&["a", "b"]));
    let events = h.engine.reconcile(&chat, &playlist).await.unwrap();
    assert_eq!(events.len(), 1, "engine still reports the committed diff");
    assert!(h.notifier.events().is_empty());

    h.notifier.set_fail(false);
    let again = h.engine.reconcile(&chat, &playlist).await.unwrap();
    assert!(again.is_empty(), "no retry of a failed notification");
}

#[tokio::test]
async fn check_now_uses_the_tracked_playlist() {
    let h = Harness::new();
    let chat = SubscriberKey::telegram(203);
    assert_eq!(h.engine.check_now(&chat).await.unwrap(), None);

    let playlist = pid("manual");
    h.catalog.set_membership(&playlist, membership_of(&["a"]));
    h.engine.set_tracking(&chat, "manual").await.unwrap();
    h.catalog
        .set_membership(&playlist, membership_of(&["a", "z"]));

    let events = h.engine.check_now(&chat).await.unwrap().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].track_id, "z");
}
