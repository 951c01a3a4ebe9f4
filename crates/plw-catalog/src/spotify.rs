//! Spotify Web API implementation of [`MembershipFetcher`].
//!
//! Auth:
//! - with a refresh token (user token cache), the refresh-token grant is used
//!   so private and collaborative playlists are visible
//! - without one, the client-credentials grant is used (public playlists only)
//!
//! The access token is cached in-process and renewed shortly before expiry,
//! or immediately after the API answers 401.

use std::fmt;
use std::time::{Duration, Instant};

use plw_schemas::{PlaylistId, PlaylistInfo, PlaylistMembership, TrackMeta};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{CatalogError, MembershipFetcher};

const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com";
const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
const MAX_PAGE_LIMIT: u32 = 100;

/// Renew this long before the token actually expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on a `next` chain (Spotify caps playlists at 10k items).
const MAX_PAGES: usize = 10_000;

const MEMBERSHIP_FIELDS: &str = "items(track(id,name,duration_ms,artists(name),album(name,images(url)),external_urls(spotify))),next";
const PLAYLIST_INFO_FIELDS: &str = "name,owner(display_name),external_urls(spotify),tracks(total)";

/// Client credentials plus the optional user refresh token.
#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &"<REDACTED>")
            .field("client_secret", &"<REDACTED>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct SpotifyCatalog {
    credentials: SpotifyCredentials,
    http: reqwest::Client,
    api_base_url: String,
    accounts_base_url: String,
    page_limit: u32,
    token: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"<REDACTED>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl SpotifyCatalog {
    pub fn new(credentials: SpotifyCredentials) -> Self {
        Self::new_with_base_urls(
            credentials,
            DEFAULT_API_BASE_URL.to_string(),
            DEFAULT_ACCOUNTS_BASE_URL.to_string(),
        )
    }

    pub fn new_with_base_urls(
        credentials: SpotifyCredentials,
        api_base_url: String,
        accounts_base_url: String,
    ) -> Self {
        Self {
            credentials,
            http: reqwest::Client::new(),
            api_base_url,
            accounts_base_url,
            page_limit: MAX_PAGE_LIMIT,
            token: Mutex::new(None),
        }
    }

    /// Items per page, clamped to 1..=100.
    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit.clamp(1, MAX_PAGE_LIMIT);
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn request_token(&self) -> Result<CachedToken, CatalogError> {
        let url = format!(
            "{}/api/token",
            self.accounts_base_url.trim_end_matches('/')
        );

        let form: Vec<(&str, &str)> = match self.credentials.refresh_token.as_deref() {
            Some(refresh_token) => vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
            None => vec![("grant_type", "client_credentials")],
        };

        let resp = self
            .http
            .post(url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&form)
            .send()
            .await
            .map_err(|e| CatalogError::Transient(format!("token request failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(CatalogError::Transient(format!(
                "token endpoint status={}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(CatalogError::Auth(format!(
                "token endpoint rejected credentials status={}",
                status.as_u16()
            )));
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| CatalogError::Decode(format!("token response: {e}")))?;

        debug!(expires_in = body.expires_in, "spotify access token renewed");

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> Result<T, CatalogError> {
        let token = self.access_token().await?;
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CatalogError::Transient(format!("{what}: request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_token().await;
            }
            return Err(classify_status(status, what));
        }

        resp.json::<T>()
            .await
            .map_err(|e| CatalogError::Decode(format!("{what}: {e}")))
    }
}

fn classify_status(status: StatusCode, what: &str) -> CatalogError {
    let code = status.as_u16();
    match status {
        // 400 is what the API answers for a malformed base62 id.
        StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            CatalogError::NotFound(format!("{what}: status={code}"))
        }
        StatusCode::UNAUTHORIZED => CatalogError::Auth(format!("{what}: status={code}")),
        _ => CatalogError::Transient(format!("{what}: status={code}")),
    }
}

#[async_trait::async_trait]
impl MembershipFetcher for SpotifyCatalog {
    fn source_name(&self) -> &'static str {
        "spotify"
    }

    async fn fetch_membership(
        &self,
        playlist: &PlaylistId,
    ) -> Result<PlaylistMembership, CatalogError> {
        let what = format!("playlist {playlist} tracks");
        let first = self
            .http
            .get(self.api_url(&format!("/v1/playlists/{}/tracks", playlist.as_str())))
            .query(&[
                ("limit", self.page_limit.to_string()),
                ("fields", MEMBERSHIP_FIELDS.to_string()),
            ]);

        let mut page: TracksPage = self.get_json(first, &what).await?;
        let mut membership = PlaylistMembership::empty();
        let mut pages = 1usize;

        loop {
            for item in page.items {
                if let Some((track_id, meta)) = item.track.and_then(TrackObject::into_entry) {
                    membership.insert(track_id, meta);
                }
            }

            // `next` is absolute and already carries limit/offset/fields.
            let Some(next) = page.next else {
                break;
            };
            if pages >= MAX_PAGES {
                return Err(CatalogError::Decode(format!(
                    "{what}: pagination did not end after {MAX_PAGES} pages"
                )));
            }
            page = self.get_json(self.http.get(next), &what).await?;
            pages += 1;
        }

        debug!(playlist = %playlist, tracks = membership.len(), pages, "membership fetched");
        Ok(membership)
    }

    async fn fetch_playlist_info(&self, playlist: &PlaylistId) -> Result<PlaylistInfo, CatalogError> {
        let what = format!("playlist {playlist}");
        let req = self
            .http
            .get(self.api_url(&format!("/v1/playlists/{}", playlist.as_str())))
            .query(&[("fields", PLAYLIST_INFO_FIELDS)]);

        let body: PlaylistObject = self.get_json(req, &what).await?;

        Ok(PlaylistInfo {
            playlist_id: playlist.clone(),
            name: body.name.unwrap_or_default(),
            owner: body.owner.and_then(|o| o.display_name),
            external_url: body.external_urls.spotify.or_else(|| Some(playlist.share_url())),
            total_tracks: body.tracks.map(|t| t.total).unwrap_or(0),
        })
    }

    async fn fetch_track(&self, track_id: &str) -> Result<Option<TrackMeta>, CatalogError> {
        let what = format!("track {track_id}");
        let req = self.http.get(self.api_url(&format!("/v1/tracks/{track_id}")));

        match self.get_json::<TrackObject>(req, &what).await {
            Ok(track) => Ok(track.into_entry().map(|(_, meta)| meta)),
            Err(CatalogError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct TracksPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    /// Null when the track was removed from the catalog.
    #[serde(default)]
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    /// Null for local files.
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    album: Option<AlbumObject>,
    duration_ms: Option<u64>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl TrackObject {
    fn into_entry(self) -> Option<(String, TrackMeta)> {
        let TrackObject {
            id,
            name,
            artists,
            album,
            duration_ms,
            external_urls,
        } = self;

        let track_id = id.filter(|id| !id.is_empty())?;
        let (album_name, artwork_url) = match album {
            Some(a) => (
                a.name.unwrap_or_default(),
                a.images.into_iter().next().map(|img| img.url),
            ),
            None => (String::new(), None),
        };

        let meta = TrackMeta {
            name: name.unwrap_or_default(),
            artists: artists.into_iter().filter_map(|a| a.name).collect(),
            album: album_name,
            duration_ms: duration_ms.unwrap_or(0),
            artwork_url,
            external_url: external_urls.spotify,
        };
        Some((track_id, meta))
    }
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    name: Option<String>,
    /// Largest first.
    #[serde(default)]
    images: Vec<ImageObject>,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistObject {
    name: Option<String>,
    owner: Option<OwnerObject>,
    #[serde(default)]
    external_urls: ExternalUrls,
    tracks: Option<TotalObject>,
}

#[derive(Debug, Deserialize)]
struct OwnerObject {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TotalObject {
    total: u64,
}
