// ⚠️ Error Taxonomy
// Transport / Format for the catalog, Install / Store for the offline cache.
//
// LookupMiss has no variant here: an unknown `cat` value decodes to `None`
// and the page falls back to "All categories".

use thiserror::Error;

/// Localized prefix shown when the catalog cannot be loaded
pub const LOAD_ERROR_PREFIX: &str = "डेटा लोड करण्यात त्रुटी आली";

// ============================================================================
// NETWORK
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Request never produced a response (offline, DNS, refused)
    #[error("network failure: {0}")]
    Network(String),

    /// Response arrived with a non-success status
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// Path could not be resolved against the base URL
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog document unreachable or answered with a bad status
    #[error("failed to fetch {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: FetchError,
    },

    /// Document parsed but is not a catalog
    #[error("Invalid data format: {0}")]
    Format(String),
}

impl CatalogError {
    /// Single user-visible message that replaces the business list.
    /// Terminal for the session: nothing retries after this is shown.
    pub fn user_message(&self) -> String {
        format!("{}: {}", LOAD_ERROR_PREFIX, self)
    }
}

// ============================================================================
// OFFLINE CACHE
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache store poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum CacheInstallError {
    /// A manifest entry could not be fetched; the controller never activates
    #[error("manifest asset {path} unavailable: {source}")]
    Fetch {
        path: String,
        #[source]
        source: FetchError,
    },

    #[error("cache store failure: {0}")]
    Store(#[from] StoreError),

    /// install() called on a controller that already left Installing
    #[error("controller is {0}, expected installing")]
    InvalidState(&'static str),
}

// ============================================================================
// TESTS
// ============================================================================
