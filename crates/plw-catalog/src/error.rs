use std::fmt;

/// Errors a [`crate::MembershipFetcher`] may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Playlist or track does not exist, or is not visible with our credentials.
    NotFound(String),
    /// Network failure, rate limiting, upstream 5xx or timeout. Retry next cycle.
    Transient(String),
    /// Credentials were rejected or a token could not be obtained.
    Auth(String),
    /// The upstream payload did not have the expected shape.
    Decode(String),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::NotFound(msg) => write!(f, "catalog not found: {msg}"),
            CatalogError::Transient(msg) => write!(f, "catalog transient error: {msg}"),
            CatalogError::Auth(msg) => write!(f, "catalog auth error: {msg}"),
            CatalogError::Decode(msg) => write!(f, "catalog decode error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}
