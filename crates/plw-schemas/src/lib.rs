//! plw-schemas
//!
//! Domain types shared by every plw crate: who is subscribed to what, what a
//! playlist looked like the last time we saw it, and what changed.
//!
//! No IO lives here. Everything is `Serialize + Deserialize` so the same
//! shapes travel through the store, the HTTP API and the SSE bus.

mod playlist_ref;

pub use playlist_ref::{PlaylistId, PlaylistRefError};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default platform tag for chat subscribers.
pub const PLATFORM_TELEGRAM: &str = "telegram";

// ---------------------------------------------------------------------------
// Subscriber / Subscription
// ---------------------------------------------------------------------------

/// Stable identity of one chat that can track a playlist.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriberKey {
    pub platform: String,
    pub chat_id: i64,
}

impl SubscriberKey {
    pub fn new(platform: impl Into<String>, chat_id: i64) -> Self {
        Self {
            platform: platform.into(),
            chat_id,
        }
    }

    pub fn telegram(chat_id: i64) -> Self {
        Self::new(PLATFORM_TELEGRAM, chat_id)
    }
}

impl fmt::Display for SubscriberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.chat_id)
    }
}

/// A (subscriber, playlist) tracking relationship. At most one per subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber: SubscriberKey,
    pub playlist_id: PlaylistId,
}

impl Subscription {
    pub fn new(subscriber: SubscriberKey, playlist_id: PlaylistId) -> Self {
        Self {
            subscriber,
            playlist_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Track metadata
// ---------------------------------------------------------------------------

/// The minimum needed to render a notification for a track, captured while
/// the track is still in the playlist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMeta {
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration_ms: u64,
    pub artwork_url: Option<String>,
    pub external_url: Option<String>,
}

impl TrackMeta {
    /// Artists joined the way chat messages show them.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }

    /// `m:ss` rendering of the duration.
    pub fn duration_label(&self) -> String {
        let minutes = self.duration_ms / 60_000;
        let seconds = (self.duration_ms % 60_000) / 1_000;
        format!("{minutes}:{seconds:02}")
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// De-duplicated membership of a playlist as fetched right now.
///
/// Keyed by track id; a track listed twice in the playlist appears once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistMembership {
    pub tracks: BTreeMap<String, TrackMeta>,
}

impl PlaylistMembership {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert a fetched track. First occurrence wins for duplicates.
    pub fn insert(&mut self, track_id: impl Into<String>, meta: TrackMeta) {
        self.tracks.entry(track_id.into()).or_insert(meta);
    }

    pub fn track_ids(&self) -> BTreeSet<String> {
        self.tracks.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl FromIterator<(String, TrackMeta)> for PlaylistMembership {
    fn from_iter<I: IntoIterator<Item = (String, TrackMeta)>>(iter: I) -> Self {
        let mut m = Self::empty();
        for (id, meta) in iter {
            m.insert(id, meta);
        }
        m
    }
}

/// Last-known membership of a subscription.
///
/// `track_ids` and `track_data` are only ever replaced together; construct
/// new snapshots through [`MembershipSnapshot::from_membership`] rather than
/// mutating one side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub track_ids: BTreeSet<String>,
    #[serde(default)]
    pub track_data: BTreeMap<String, TrackMeta>,
}

impl MembershipSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_membership(current: &PlaylistMembership) -> Self {
        Self {
            track_ids: current.track_ids(),
            track_data: current.tracks.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.track_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }

    pub fn meta(&self, track_id: &str) -> Option<&TrackMeta> {
        self.track_data.get(track_id)
    }
}

// ---------------------------------------------------------------------------
// Diff events
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Added,
    Removed,
}

impl DiffKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffKind::Added => "added",
            DiffKind::Removed => "removed",
        }
    }
}

/// One notification unit produced by a reconciliation pass.
///
/// `meta` is `None` only for a removed track whose metadata could not be
/// recovered; transports render a generic message for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEvent {
    pub kind: DiffKind,
    pub track_id: String,
    pub meta: Option<TrackMeta>,
}

impl DiffEvent {
    pub fn added(track_id: impl Into<String>, meta: TrackMeta) -> Self {
        Self {
            kind: DiffKind::Added,
            track_id: track_id.into(),
            meta: Some(meta),
        }
    }

    pub fn removed(track_id: impl Into<String>, meta: Option<TrackMeta>) -> Self {
        Self {
            kind: DiffKind::Removed,
            track_id: track_id.into(),
            meta,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.meta.is_none()
    }
}

// ---------------------------------------------------------------------------
// Playlist info
// ---------------------------------------------------------------------------

/// Display metadata of a playlist, shown when tracking starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub playlist_id: PlaylistId,
    pub name: String,
    pub owner: Option<String>,
    pub external_url: Option<String>,
    pub total_tracks: u64,
}
