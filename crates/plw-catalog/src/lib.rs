//! plw-catalog
//!
//! Read-only access to the music catalog: who is in a playlist right now, what
//! the playlist is called, and what a single track looks like.
//!
//! The engine only sees [`MembershipFetcher`]. [`SpotifyCatalog`] is the
//! production implementation; tests plug in scripted fetchers from
//! `plw-testkit`.

mod error;
mod spotify;

pub use error::CatalogError;
pub use spotify::{SpotifyCatalog, SpotifyCredentials};

use plw_schemas::{PlaylistId, PlaylistInfo, PlaylistMembership, TrackMeta};

/// Catalog boundary used by the reconciliation engine.
///
/// Implementations must be `Send + Sync`; the engine holds one behind an
/// `Arc<dyn MembershipFetcher>` and calls it from many tasks.
#[async_trait::async_trait]
pub trait MembershipFetcher: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Complete, de-duplicated membership of `playlist`, all pages included.
    ///
    /// Items without a track or without a track id are skipped. Any failure
    /// mid-pagination fails the whole call; partial membership is never
    /// returned.
    async fn fetch_membership(&self, playlist: &PlaylistId)
        -> Result<PlaylistMembership, CatalogError>;

    async fn fetch_playlist_info(&self, playlist: &PlaylistId)
        -> Result<PlaylistInfo, CatalogError>;

    /// Single track lookup. `Ok(None)` when the catalog no longer knows the id.
    async fn fetch_track(&self, track_id: &str) -> Result<Option<TrackMeta>, CatalogError>;
}
