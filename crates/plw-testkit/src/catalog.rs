use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use plw_catalog::{CatalogError, MembershipFetcher};
use plw_schemas::{PlaylistId, PlaylistInfo, PlaylistMembership, TrackMeta};

#[derive(Default)]
struct Script {
    memberships: HashMap<PlaylistId, Result<PlaylistMembership, CatalogError>>,
    infos: HashMap<PlaylistId, PlaylistInfo>,
    tracks: HashMap<String, TrackMeta>,
    delay: Option<Duration>,
    track_delay: Option<Duration>,
}

/// [`MembershipFetcher`] that answers from a script.
///
/// Unknown playlists are `NotFound`. Playlist info defaults to a name derived
/// from the id and the scripted membership size.
#[derive(Default)]
pub struct ScriptedCatalog {
    script: Mutex<Script>,
    membership_calls: AtomicUsize,
    track_calls: AtomicUsize,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_membership(&self, playlist: &PlaylistId, membership: PlaylistMembership) {
        self.script()
            .memberships
            .insert(playlist.clone(), Ok(membership));
    }

    /// Make `fetch_membership` (and `fetch_playlist_info`) fail for `playlist`.
    pub fn fail_membership(&self, playlist: &PlaylistId, err: CatalogError) {
        self.script().memberships.insert(playlist.clone(), Err(err));
    }

    pub fn set_info(&self, info: PlaylistInfo) {
        self.script().infos.insert(info.playlist_id.clone(), info);
    }

    /// Track known to single-track lookups.
    pub fn set_track(&self, track_id: &str, meta: TrackMeta) {
        self.script().tracks.insert(track_id.to_string(), meta);
    }

    /// Sleep this long before every membership answer.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.script().delay = delay;
    }

    /// Sleep this long before every single-track answer.
    pub fn set_track_delay(&self, delay: Option<Duration>) {
        self.script().track_delay = delay;
    }

    pub fn membership_calls(&self) -> usize {
        self.membership_calls.load(Ordering::SeqCst)
    }

    pub fn track_calls(&self) -> usize {
        self.track_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, playlist: &PlaylistId) -> Result<PlaylistMembership, CatalogError> {
        match self.script().memberships.get(playlist) {
            Some(res) => res.clone(),
            None => Err(CatalogError::NotFound(format!("playlist {playlist}"))),
        }
    }
}

#[async_trait::async_trait]
impl MembershipFetcher for ScriptedCatalog {
    fn source_name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_membership(
        &self,
        playlist: &PlaylistId,
    ) -> Result<PlaylistMembership, CatalogError> {
        self.membership_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.script().delay;
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        // Read after the delay so a script change during the sleep is observed.
        self.lookup(playlist)
    }

    async fn fetch_playlist_info(&self, playlist: &PlaylistId) -> Result<PlaylistInfo, CatalogError> {
        if let Some(info) = self.script().infos.get(playlist).cloned() {
            return Ok(info);
        }
        let membership = self.lookup(playlist)?;
        Ok(PlaylistInfo {
            playlist_id: playlist.clone(),
            name: format!("Playlist {playlist}"),
            owner: Some("tester".to_string()),
            external_url: Some(playlist.share_url()),
            total_tracks: membership.len() as u64,
        })
    }

    async fn fetch_track(&self, track_id: &str) -> Result<Option<TrackMeta>, CatalogError> {
        self.track_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.script().track_delay;
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        Ok(self.script().tracks.get(track_id).cloned())
    }
}
