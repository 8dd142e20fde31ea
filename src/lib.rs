// Jawala Business Directory - Core Library
// Exposes the directory pipeline and the offline cache for CLI, server and tests

pub mod error;
pub mod config;
pub mod fetch;
pub mod catalog;        // load + shape check
pub mod category_index; // category grid
pub mod filter;         // search / category filter + grouping
pub mod selection;      // `?cat=` <-> selected category
pub mod contact;        // phone formatting, call / chat / share payloads
pub mod cache;          // offline cache controller

// Re-export commonly used types
pub use error::{CacheInstallError, CatalogError, FetchError, StoreError};
pub use config::DirectoryConfig;
pub use fetch::{FetchResponse, Fetcher, HttpFetcher, MemoryFetcher};
pub use catalog::{
    AtomicLoadingFlag, Business, Catalog, CatalogStore, Category, IntegrityIssue, IssueKind,
    LoadingSignal,
};
pub use category_index::{dedupe, CategoryEntry, CategoryIndex};
pub use filter::{filter, view, BusinessGroup, FilterOutcome, FilterState};
pub use selection::{decode, encode, initial_selection, History, InitialSelection, Location, MemoryHistory};
pub use contact::format_phone_number;
pub use cache::{
    CacheController, CacheStore, ControllerState, MemoryCacheStore, Registration,
    RegistrationState, ResponseSource, Served, SqliteCacheStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
