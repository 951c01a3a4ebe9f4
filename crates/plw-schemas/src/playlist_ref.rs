//! Playlist reference parsing.
//!
//! Users paste either a bare playlist id (`37i9dQZF1DXcBWIGoYBM5M`), a share
//! URL (`https://open.spotify.com/playlist/<id>?si=...`) or a URI
//! (`spotify:playlist:<id>`). All three normalize to the same [`PlaylistId`].

use std::fmt;

use serde::{Deserialize, Serialize};

const URL_SEGMENT: &str = "playlist/";
const URI_PREFIX: &str = "spotify:playlist:";

/// Canonical playlist identifier: non-empty ASCII alphanumerics only.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlaylistId(String);

/// The input matched neither a bare id nor a playlist URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistRefError {
    pub input: String,
}

impl fmt::Display for PlaylistRefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid playlist reference '{}': expected a playlist URL or playlist id",
            self.input
        )
    }
}

impl std::error::Error for PlaylistRefError {}

fn is_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Longest alphanumeric run at the start of `s`.
fn leading_id(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphanumeric())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}

impl PlaylistId {
    /// Parse a user-supplied reference into a canonical id.
    pub fn parse(input: &str) -> Result<Self, PlaylistRefError> {
        let raw = input.trim();
        let err = || PlaylistRefError {
            input: raw.to_string(),
        };

        if let Some(rest) = raw.strip_prefix(URI_PREFIX) {
            return if is_id(rest) {
                Ok(Self(rest.to_string()))
            } else {
                Err(err())
            };
        }

        if raw.contains("spotify.com") {
            if let Some(idx) = raw.find(URL_SEGMENT) {
                let id = leading_id(&raw[idx + URL_SEGMENT.len()..]);
                if is_id(id) {
                    return Ok(Self(id.to_string()));
                }
            }
        }

        if is_id(raw) {
            return Ok(Self(raw.to_string()));
        }

        Err(err())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public share URL for this playlist.
    pub fn share_url(&self) -> String {
        format!("https://open.spotify.com/playlist/{}", self.0)
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PlaylistId {
    type Error = PlaylistRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_id(&value) {
            Ok(Self(value))
        } else {
            Err(PlaylistRefError { input: value })
        }
    }
}

impl From<PlaylistId> for String {
    fn from(value: PlaylistId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_id_is_accepted() {
        let id = PlaylistId::parse("37i9dQZF1DXcBWIGoYBM5M").unwrap();
        assert_eq!(id.as_str(), "37i9dQZF1DXcBWIGoYBM5M");
    }

    #[test]
    fn share_url_with_query_is_accepted() {
        let id =
            PlaylistId::parse("https://open.spotify.com/playlist/37i9dQZF1DX0XUsuxWHRQd?si=abc123")
                .unwrap();
        assert_eq!(id.as_str(), "37i9dQZF1DX0XUsuxWHRQd");
    }

    #[test]
    fn localized_share_url_is_accepted() {
        let id = PlaylistId::parse("https://open.spotify.com/intl-de/playlist/abcDEF123").unwrap();
        assert_eq!(id.as_str(), "abcDEF123");
    }

    #[test]
    fn uri_form_is_accepted() {
        let id = PlaylistId::parse("spotify:playlist:abc123").unwrap();
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(PlaylistId::parse("  abc123\n").unwrap().as_str(), "abc123");
    }

    #[test]
    fn garbage_is_rejected() {
        for bad in [
            "",
            "not a playlist",
            "https://open.spotify.com/album/abc123",
            "https://example.com/playlist/abc123",
            "https://open.spotify.com/playlist/",
            "spotify:playlist:",
            "abc-123",
        ] {
            let err = PlaylistId::parse(bad).unwrap_err();
            assert_eq!(err.input, bad.trim());
        }
    }

    #[test]
    fn deserialize_rejects_non_canonical_ids() {
        let ok: PlaylistId = serde_json::from_str(r#""abc123""#).unwrap();
        assert_eq!(ok.as_str(), "abc123");
        assert!(serde_json::from_str::<PlaylistId>(r#""abc/123""#).is_err());
    }

    #[test]
    fn share_url_round_trips_through_parse() {
        let id = PlaylistId::parse("abc123").unwrap();
        assert_eq!(PlaylistId::parse(&id.share_url()).unwrap(), id);
    }
}
