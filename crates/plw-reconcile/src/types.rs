use plw_schemas::{DiffEvent, DiffKind, MembershipSnapshot};

/// What the engine tells the runtime about one pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileAction {
    /// No previous snapshot existed; current membership becomes the baseline.
    Baseline,
    /// Previous and current membership are the same set.
    Unchanged,
    /// At least one track was added or removed.
    Changed,
}

/// Result of diffing one subscription.
///
/// `next` is the snapshot to commit. It is always produced, including for
/// [`ReconcileAction::Unchanged`], so the stored metadata tracks the latest
/// fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    pub action: ReconcileAction,
    /// Added events (ascending track id) followed by removed events
    /// (ascending track id).
    pub events: Vec<DiffEvent>,
    pub next: MembershipSnapshot,
}

impl ReconcileReport {
    pub fn added_count(&self) -> usize {
        self.count(DiffKind::Added)
    }

    pub fn removed_count(&self) -> usize {
        self.count(DiffKind::Removed)
    }

    pub fn is_baseline(&self) -> bool {
        self.action == ReconcileAction::Baseline
    }

    fn count(&self, kind: DiffKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Removed events whose metadata was missing from the previous snapshot.
    pub fn degraded_removals(&self) -> impl Iterator<Item = &DiffEvent> {
        self.events
            .iter()
            .filter(|e| e.kind == DiffKind::Removed && e.is_degraded())
    }
}
