use std::fmt;

use plw_catalog::CatalogError;
use plw_schemas::PlaylistRefError;

/// Errors surfaced by [`crate::TrackerEngine`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The user-supplied playlist reference could not be parsed.
    InvalidReference(String),
    /// Playlist does not exist or is not visible with our credentials.
    NotFound(String),
    /// Catalog unavailable, rate-limited, timed out or misbehaving. Retry later.
    Transient(String),
    /// The state store failed; nothing was committed.
    Store(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::InvalidReference(input) => {
                write!(f, "invalid playlist reference: '{input}'")
            }
            TrackerError::NotFound(msg) => write!(f, "playlist not found: {msg}"),
            TrackerError::Transient(msg) => write!(f, "temporarily unavailable: {msg}"),
            TrackerError::Store(msg) => write!(f, "state store error: {msg}"),
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<PlaylistRefError> for TrackerError {
    fn from(e: PlaylistRefError) -> Self {
        TrackerError::InvalidReference(e.input)
    }
}

impl From<CatalogError> for TrackerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(msg) => TrackerError::NotFound(msg),
            CatalogError::Transient(msg) => TrackerError::Transient(msg),
            CatalogError::Auth(msg) => TrackerError::Transient(format!("catalog auth: {msg}")),
            CatalogError::Decode(msg) => TrackerError::Transient(format!("catalog decode: {msg}")),
        }
    }
}

impl From<StoreError> for TrackerError {
    fn from(e: StoreError) -> Self {
        TrackerError::Store(e.0)
    }
}

/// Failure reported by a [`crate::StateStore`] backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        StoreError(format!("{e:#}"))
    }
}

/// Failure delivering one notification. Logged by the engine, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Network or transport failure.
    Transport(String),
    /// The chat platform answered with an error.
    Rejected { status: u16, message: String },
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Transport(msg) => write!(f, "notify transport error: {msg}"),
            NotifyError::Rejected { status, message } => {
                write!(f, "notify rejected status={status}: {message}")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_auth_and_decode_become_transient() {
        let auth: TrackerError = CatalogError::Auth("401".to_string()).into();
        let decode: TrackerError = CatalogError::Decode("eof".to_string()).into();
        assert!(matches!(auth, TrackerError::Transient(_)));
        assert!(matches!(decode, TrackerError::Transient(_)));
    }

    #[test]
    fn catalog_not_found_stays_not_found() {
        let e: TrackerError = CatalogError::NotFound("playlist abc".to_string()).into();
        assert_eq!(e, TrackerError::NotFound("playlist abc".to_string()));
    }

    #[test]
    fn bad_reference_keeps_the_input() {
        let e: TrackerError = plw_schemas::PlaylistId::parse("not a playlist!")
            .unwrap_err()
            .into();
        assert_eq!(e.to_string(), "invalid playlist reference: 'not a playlist!'");
    }

    #[test]
    fn anyhow_chain_is_flattened_into_store_error() {
        let e = anyhow::anyhow!("connection reset").context("save_snapshot failed");
        let s: StoreError = e.into();
        assert_eq!(s.0, "save_snapshot failed: connection reset");
    }
}
