// 📒 Catalog Store - load once, immutable for the session
//
// The catalog document is `{ categories: [...], businesses: [...] }` at a
// well-known path. Loading fetches it, checks the shape and hands back the
// parsed value unmodified. No normalization, no write-back.

use crate::error::{CatalogError, FetchError};
use crate::fetch::Fetcher;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// DATA MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique id, referenced by `Business::category` and the `cat` query param
    pub id: String,

    /// Display label
    pub name: String,

    /// Icon class; opaque to the core
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub shop_name: String,
    pub owner_name: String,

    /// Digits, expected length 10
    pub contact_number: String,

    /// Should match some `Category::id`; unknown values are tolerated
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
    pub businesses: Vec<Business>,
}

impl Catalog {
    /// Parse a catalog document, failing with `Format` when either
    /// top-level sequence is missing (or null) or an entry is malformed
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| CatalogError::Format(format!("not JSON: {}", e)))?;

        let has = |field: &str| value.get(field).map_or(false, |v| !v.is_null());
        if !has("categories") || !has("businesses") {
            return Err(CatalogError::Format(
                "Missing categories or businesses".to_string(),
            ));
        }

        serde_json::from_value(value).map_err(|e| CatalogError::Format(e.to_string()))
    }

    /// First category with this id (later duplicates are shadowed)
    pub fn category_by_id(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Advisory data-quality pass; never alters the catalog
    pub fn integrity_report(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        // `?cat=` with an empty value means All, so such a category can be
        // selected but never shared
        for (index, category) in self.categories.iter().enumerate() {
            if category.id.is_empty() {
                issues.push(IntegrityIssue {
                    index,
                    name: category.name.clone(),
                    kind: IssueKind::EmptyCategoryId,
                });
            }
        }

        for (index, business) in self.businesses.iter().enumerate() {
            if self.category_by_id(&business.category).is_none() {
                issues.push(IntegrityIssue {
                    index,
                    name: business.shop_name.clone(),
                    kind: IssueKind::UnknownCategory(business.category.clone()),
                });
            }

            let digits = business.contact_number.chars().count();
            let all_digits = business.contact_number.chars().all(|c| c.is_ascii_digit());
            if digits != 10 || !all_digits {
                issues.push(IntegrityIssue {
                    index,
                    name: business.shop_name.clone(),
                    kind: IssueKind::ContactNumber(business.contact_number.clone()),
                });
            }
        }

        issues
    }
}

// ============================================================================
// INTEGRITY ISSUES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// Category with `id == ""`
    EmptyCategoryId,

    /// `business.category` references no known category id
    UnknownCategory(String),

    /// Contact number is not exactly ten digits
    ContactNumber(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityIssue {
    /// Position in `categories` for category issues, in `businesses` otherwise
    pub index: usize,

    /// Category name or shop name
    pub name: String,
    pub kind: IssueKind,
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            IssueKind::EmptyCategoryId => write!(
                f,
                "category #{} {}: empty id cannot be shared as ?cat=",
                self.index, self.name
            ),
            IssueKind::UnknownCategory(id) => write!(
                f,
                "#{} {}: unknown category '{}'",
                self.index, self.name, id
            ),
            IssueKind::ContactNumber(number) => write!(
                f,
                "#{} {}: contact number '{}' is not 10 digits",
                self.index, self.name, number
            ),
        }
    }
}

// ============================================================================
// LOADING SIGNAL
// ============================================================================

/// Progress indicator hook, raised while the catalog fetch is in flight
pub trait LoadingSignal: Send + Sync {
    fn begin(&self);
    fn end(&self);
}

/// Plain flag; what the page overlay would observe
#[derive(Debug, Default)]
pub struct AtomicLoadingFlag {
    active: AtomicBool,
}

impl AtomicLoadingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl LoadingSignal for AtomicLoadingFlag {
    fn begin(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    fn end(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Clears the signal on every exit path, including early `?` returns
struct LoadingGuard<'a> {
    signal: &'a dyn LoadingSignal,
}

impl<'a> LoadingGuard<'a> {
    fn raise(signal: &'a dyn LoadingSignal) -> Self {
        signal.begin();
        LoadingGuard { signal }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.signal.end();
    }
}

// ============================================================================
// CATALOG STORE
// ============================================================================

/// One-shot loader. `load` consumes the store, so a session cannot issue a
/// second (or concurrent) catalog fetch.
///
/// There is no timeout: a request that never completes leaves the loading
/// signal raised.
pub struct CatalogStore<F: Fetcher> {
    fetcher: F,
    path: String,
}

impl<F: Fetcher> CatalogStore<F> {
    pub fn new(fetcher: F, path: &str) -> Self {
        CatalogStore {
            fetcher,
            path: path.to_string(),
        }
    }

    pub async fn load(self, signal: &dyn LoadingSignal) -> Result<Catalog, CatalogError> {
        let _guard = LoadingGuard::raise(signal);
        tracing::info!(path = %self.path, "loading catalog");

        let response = self
            .fetcher
            .fetch(&self.path)
            .await
            .map_err(|source| self.transport(source))?;

        if !response.is_success() {
            return Err(self.transport(FetchError::Status(response.status)));
        }

        let catalog = Catalog::from_json(&response.text()).map_err(|e| {
            tracing::error!(error = %e, "catalog rejected");
            e
        })?;

        tracing::info!(
            categories = catalog.categories.len(),
            businesses = catalog.businesses.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    fn transport(&self, source: FetchError) -> CatalogError {
        tracing::error!(path = %self.path, error = %source, "catalog fetch failed");
        CatalogError::Transport {
            path: self.path.clone(),
            source,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchResponse, MemoryFetcher};
    use async_trait::async_trait;
    use std::sync::Arc;

    const PATH: &str = "/data/businesses.json";

    const DOC: &str = r#"{
        "categories": [{"id": "grocery", "name": "Grocery", "icon": "fas fa-store"}],
        "businesses": [{"shopName": "A", "ownerName": "B", "contactNumber": "9876543210", "category": "grocery"}]
    }"#;

    fn store_with(response: FetchResponse) -> CatalogStore<MemoryFetcher> {
        CatalogStore::new(MemoryFetcher::new().with_response(PATH, response), PATH)
    }

    #[tokio::test]
    async fn test_load_success_unmodified() {
        let flag = AtomicLoadingFlag::new();
        let catalog = store_with(FetchResponse::ok("application/json", DOC))
            .load(&flag)
            .await
            .unwrap();

        assert_eq!(catalog.categories.len(), 1);
        assert_eq!(catalog.businesses[0].shop_name, "A");
        assert_eq!(catalog.businesses[0].contact_number, "9876543210");
        assert!(!flag.is_active());
    }

    #[tokio::test]
    async fn test_load_bad_status_is_transport_error() {
        let flag = AtomicLoadingFlag::new();
        let result = store_with(FetchResponse::with_status(500)).load(&flag).await;

        match result {
            Err(CatalogError::Transport { source, .. }) => {
                assert_eq!(source, FetchError::Status(500));
            }
            other => panic!("expected transport error, got {:?}", other),
        }
        assert!(!flag.is_active());
    }

    #[tokio::test]
    async fn test_load_offline_is_transport_error() {
        let fetcher = MemoryFetcher::new();
        fetcher.set_offline(true);
        let flag = AtomicLoadingFlag::new();

        let result = CatalogStore::new(fetcher, PATH).load(&flag).await;

        assert!(matches!(result, Err(CatalogError::Transport { .. })));
        assert!(!flag.is_active());
    }

    #[tokio::test]
    async fn test_load_missing_field_is_format_error() {
        let flag = AtomicLoadingFlag::new();
        let result = store_with(FetchResponse::ok("application/json", r#"{"categories": []}"#))
            .load(&flag)
            .await;

        assert!(matches!(result, Err(CatalogError::Format(_))));
        assert!(!flag.is_active());
    }

    #[test]
    fn test_null_field_is_format_error() {
        let result = Catalog::from_json(r#"{"categories": [], "businesses": null}"#);
        assert!(matches!(result, Err(CatalogError::Format(_))));
    }

    #[test]
    fn test_missing_icon_defaults_empty() {
        let catalog =
            Catalog::from_json(r#"{"categories": [{"id": "x", "name": "X"}], "businesses": []}"#)
                .unwrap();
        assert_eq!(catalog.categories[0].icon, "");
    }

    #[test]
    fn test_signal_raised_during_guard() {
        let flag = AtomicLoadingFlag::new();
        {
            let _guard = LoadingGuard::raise(&flag);
            assert!(flag.is_active());
        }
        assert!(!flag.is_active());
    }

    #[test]
    fn test_integrity_report() {
        let catalog = Catalog {
            categories: vec![Category {
                id: "grocery".to_string(),
                name: "Grocery".to_string(),
                icon: String::new(),
            }],
            businesses: vec![
                Business {
                    shop_name: "Good".to_string(),
                    owner_name: "O".to_string(),
                    contact_number: "9876543210".to_string(),
                    category: "grocery".to_string(),
                },
                Business {
                    shop_name: "Orphan".to_string(),
                    owner_name: "O".to_string(),
                    contact_number: "98765".to_string(),
                    category: "bakery".to_string(),
                },
            ],
        };

        let issues = catalog.integrity_report();

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.index == 1));
        assert_eq!(issues[0].kind, IssueKind::UnknownCategory("bakery".to_string()));
        assert_eq!(issues[1].kind, IssueKind::ContactNumber("98765".to_string()));
    }

    #[test]
    fn test_integrity_flags_empty_category_id() {
        let catalog = Catalog::from_json(
            r#"{"categories": [{"id": "grocery", "name": "Grocery"}, {"id": "", "name": "Blank"}],
                "businesses": []}"#,
        )
        .unwrap();

        let issues = catalog.integrity_report();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::EmptyCategoryId);
        assert_eq!((issues[0].index, issues[0].name.as_str()), (1, "Blank"));
        assert!(issues[0].to_string().contains("?cat="));
    }

    #[tokio::test]
    async fn test_signal_raised_while_fetch_in_flight() {
        struct ObservingFetcher {
            flag: Arc<AtomicLoadingFlag>,
            seen_active: Arc<AtomicBool>,
        }

        #[async_trait]
        impl Fetcher for ObservingFetcher {
            async fn fetch(&self, _path: &str) -> Result<FetchResponse, FetchError> {
                self.seen_active.store(self.flag.is_active(), Ordering::SeqCst);
                Ok(FetchResponse::ok("application/json", DOC))
            }
        }

        let flag = Arc::new(AtomicLoadingFlag::new());
        let seen_active = Arc::new(AtomicBool::new(false));
        let fetcher = ObservingFetcher {
            flag: flag.clone(),
            seen_active: seen_active.clone(),
        };

        assert!(!flag.is_active());
        CatalogStore::new(fetcher, PATH).load(&*flag).await.unwrap();

        assert!(seen_active.load(Ordering::SeqCst));
        assert!(!flag.is_active());
    }
}
