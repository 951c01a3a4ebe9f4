use plw_schemas::{DiffEvent, MembershipSnapshot, PlaylistMembership};

use crate::{ReconcileAction, ReconcileReport};

/// Record `current` as the starting point of a subscription. Emits nothing.
pub fn baseline(current: &PlaylistMembership) -> ReconcileReport {
    ReconcileReport {
        action: ReconcileAction::Baseline,
        events: Vec::new(),
        next: MembershipSnapshot::from_membership(current),
    }
}

/// Set-difference reconciliation:
/// - `added   = current - previous`
/// - `removed = previous - current`
/// - tracks in both produce no event
///
/// `previous == None` means the subscription has never been observed and is
/// treated as a [`baseline`].
pub fn reconcile_membership(
    previous: Option<&MembershipSnapshot>,
    current: &PlaylistMembership,
) -> ReconcileReport {
    let Some(previous) = previous else {
        return baseline(current);
    };

    let mut events: Vec<DiffEvent> = Vec::new();

    // BTreeMap / BTreeSet iteration keeps event order stable across runs.
    for (track_id, meta) in &current.tracks {
        if !previous.track_ids.contains(track_id) {
            events.push(DiffEvent::added(track_id.clone(), meta.clone()));
        }
    }

    for track_id in &previous.track_ids {
        if !current.tracks.contains_key(track_id) {
            events.push(DiffEvent::removed(
                track_id.clone(),
                previous.meta(track_id).cloned(),
            ));
        }
    }

    let action = if events.is_empty() {
        ReconcileAction::Unchanged
    } else {
        ReconcileAction::Changed
    };

    ReconcileReport {
        action,
        events,
        next: MembershipSnapshot::from_membership(current),
    }
}

/// `true` when `current` has exactly the track ids of `previous`.
pub fn is_unchanged(previous: &MembershipSnapshot, current: &PlaylistMembership) -> bool {
    previous.track_ids.len() == current.tracks.len()
        && previous
            .track_ids
            .iter()
            .all(|id| current.tracks.contains_key(id))
}
