//! plw-testkit
//!
//! In-process fakes for every engine seam plus a [`Harness`] that wires them
//! into a [`TrackerEngine`]. No network, no database.

mod catalog;
mod notifier;
mod store;

pub use catalog::ScriptedCatalog;
pub use notifier::RecordingNotifier;
pub use store::MemoryStateStore;

use std::sync::Arc;
use std::time::Duration;

use plw_runtime::{EngineSettings, TrackerEngine};
use plw_schemas::{PlaylistMembership, TrackMeta};

/// Deterministic metadata for a track id: name `Song <id>`, album art URL set.
pub fn track_meta(track_id: &str) -> TrackMeta {
    TrackMeta {
        name: format!("Song {track_id}"),
        artists: vec![format!("Artist {track_id}")],
        album: format!("Album {track_id}"),
        duration_ms: 180_000,
        artwork_url: Some(format!("https://img.example/{track_id}.jpg")),
        external_url: Some(format!("https://open.spotify.com/track/{track_id}")),
    }
}

/// Membership containing exactly `ids`, each with [`track_meta`].
pub fn membership_of(ids: &[&str]) -> PlaylistMembership {
    ids.iter().map(|id| (id.to_string(), track_meta(id))).collect()
}

/// Engine wired to fresh fakes.
pub struct Harness {
    pub engine: Arc<TrackerEngine>,
    pub catalog: Arc<ScriptedCatalog>,
    pub store: Arc<MemoryStateStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub const FETCH_TIMEOUT: Duration = Duration::from_millis(500);
    pub const NOTIFY_TIMEOUT: Duration = Duration::from_millis(300);

    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStateStore::new()))
    }

    /// New engine (cold cache) over an existing store, e.g. to model a restart.
    pub fn with_store(store: Arc<MemoryStateStore>) -> Self {
        let catalog = Arc::new(ScriptedCatalog::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = Arc::new(TrackerEngine::new(
            catalog.clone(),
            store.clone(),
            notifier.clone(),
            EngineSettings {
                fetch_timeout: Self::FETCH_TIMEOUT,
                notify_timeout: Self::NOTIFY_TIMEOUT,
            },
        ));
        Self {
            engine,
            catalog,
            store,
            notifier,
        }
    }
}
