//! Scenario: set-difference correctness
//!
//! For current set C and previous set P:
//! - added   == C \ P
//! - removed == P \ C
//! - added and removed are disjoint
//! - tracks in C ∩ P never produce an event

use std::collections::BTreeSet;

use plw_reconcile::*;
use plw_schemas::{DiffKind, MembershipSnapshot, PlaylistMembership, TrackMeta};

fn meta(id: &str) -> TrackMeta {
    TrackMeta {
        name: format!("song {id}"),
        artists: vec![format!("artist {id}")],
        album: "album".to_string(),
        duration_ms: 200_000,
        artwork_url: None,
        external_url: Some(format!("https://open.spotify.com/track/{id}")),
    }
}

fn membership(ids: &[&str]) -> PlaylistMembership {
    ids.iter().map(|id| (id.to_string(), meta(id))).collect()
}

fn ids_of(report: &ReconcileReport, kind: DiffKind) -> BTreeSet<String> {
    report
        .events
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| e.track_id.clone())
        .collect()
}

#[test]
fn scenario_abc_to_bcd_adds_d_removes_a() {
    let prev = MembershipSnapshot::from_membership(&membership(&["A", "B", "C"]));
    let current = membership(&["B", "C", "D"]);

    let r = reconcile_membership(Some(&prev), &current);

    assert_eq!(r.action, ReconcileAction::Changed);
    assert_eq!(r.events.len(), 2);
    assert_eq!(r.events[0].kind, DiffKind::Added);
    assert_eq!(r.events[0].track_id, "D");
    assert_eq!(r.events[1].kind, DiffKind::Removed);
    assert_eq!(r.events[1].track_id, "A");

    let expected: BTreeSet<String> = ["B", "C", "D"].iter().map(|s| s.to_string()).collect();
    assert_eq!(r.next.track_ids, expected);
}

#[test]
fn scenario_added_and_removed_match_set_differences() {
    let p = ["a", "b", "c", "d", "e"];
    let c = ["c", "d", "e", "f", "g", "h"];
    let prev = MembershipSnapshot::from_membership(&membership(&p));
    let r = reconcile_membership(Some(&prev), &membership(&c));

    let pset: BTreeSet<String> = p.iter().map(|s| s.to_string()).collect();
    let cset: BTreeSet<String> = c.iter().map(|s| s.to_string()).collect();

    let added = ids_of(&r, DiffKind::Added);
    let removed = ids_of(&r, DiffKind::Removed);

    assert_eq!(added, cset.difference(&pset).cloned().collect());
    assert_eq!(removed, pset.difference(&cset).cloned().collect());
    assert!(added.is_disjoint(&removed));

    for unchanged in cset.intersection(&pset) {
        assert!(
            r.events.iter().all(|e| &e.track_id != unchanged),
            "unchanged track {unchanged} must not produce an event"
        );
    }
}

#[test]
fn scenario_fetch_order_is_irrelevant() {
    let prev = MembershipSnapshot::from_membership(&membership(&["x", "y"]));

    let forward = reconcile_membership(Some(&prev), &membership(&["y", "z", "x"]));
    let backward = reconcile_membership(Some(&prev), &membership(&["x", "z", "y"]));

    assert_eq!(forward, backward);
    assert_eq!(forward.added_count(), 1);
    assert_eq!(forward.removed_count(), 0);
}

#[test]
fn scenario_empty_playlist_removes_everything() {
    let prev = MembershipSnapshot::from_membership(&membership(&["a", "b"]));
    let r = reconcile_membership(Some(&prev), &PlaylistMembership::empty());

    assert_eq!(r.removed_count(), 2);
    assert_eq!(r.added_count(), 0);
    assert!(r.next.is_empty());
}

#[test]
fn scenario_second_pass_without_change_is_silent() {
    let first = reconcile_membership(None, &membership(&["a", "b"]));
    let second = reconcile_membership(Some(&first.next), &membership(&["a", "b"]));

    assert_eq!(second.action, ReconcileAction::Unchanged);
    assert!(second.events.is_empty());
}
