// 📴 Cache Controller - cache-first request interceptor
//
// Lifecycle (one controller per cache version):
//
//   Installing --install()--> Waiting --activate()--> Active
//        |                                              |
//        +--(any manifest asset fails)--> Redundant <---+ (replaced)
//
// Once Active, every request is answered from the versioned store when
// present (verbatim, no revalidation) and from the network otherwise.
// Network responses are never written back: the store is static after
// install.
//
// The controller shares nothing with the page: it owns its store handle
// and fetcher, and the page never reads the store directly.

use crate::config::{DirectoryConfig, CACHE_PREFIX};
use crate::error::{CacheInstallError, FetchError, StoreError};
use crate::fetch::{FetchResponse, Fetcher};
use super::store::{CacheStore, CachedEntry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// STATES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Installing,
    Waiting,
    Active,
    Redundant,
}

impl ControllerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Installing => "installing",
            ControllerState::Waiting => "waiting",
            ControllerState::Active => "active",
            ControllerState::Redundant => "redundant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseSource {
    Cache,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub source: ResponseSource,
    pub response: FetchResponse,
}

// ============================================================================
// CACHE CONTROLLER
// ============================================================================

pub struct CacheController {
    cache_name: String,
    manifest: Vec<String>,
    evict_stale: bool,
    state: ControllerState,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn CacheStore>,
}

impl CacheController {
    pub fn new(
        cache_name: &str,
        manifest: Vec<String>,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        CacheController {
            cache_name: cache_name.to_string(),
            manifest,
            evict_stale: true,
            state: ControllerState::Installing,
            fetcher,
            store,
        }
    }

    pub fn from_config(
        config: &DirectoryConfig,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self::new(&config.cache_name, config.manifest.clone(), fetcher, store)
            .with_eviction(config.evict_stale_caches)
    }

    /// Builder pattern: `false` keeps every older versioned store around
    pub fn with_eviction(mut self, evict_stale: bool) -> Self {
        self.evict_stale = evict_stale;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    /// Pick up a version installed by an earlier process. The store is
    /// persistent, so an existing store for this name counts as installed.
    pub fn resume(mut self) -> Result<Self, StoreError> {
        if self.state == ControllerState::Installing && self.store.has_cache(&self.cache_name)? {
            self.state = ControllerState::Waiting;
        }
        Ok(self)
    }

    /// Fetch the whole manifest, then write it in one go. Any failed asset
    /// (network error or non-2xx) aborts: nothing is stored and the
    /// controller becomes Redundant.
    pub async fn install(&mut self) -> Result<(), CacheInstallError> {
        if self.state != ControllerState::Installing {
            return Err(CacheInstallError::InvalidState(self.state.as_str()));
        }

        tracing::info!(cache = %self.cache_name, assets = self.manifest.len(), "installing");

        match self.fetch_manifest().await {
            Ok(entries) => {
                if let Err(e) = self.store.put_all(&self.cache_name, &entries) {
                    self.state = ControllerState::Redundant;
                    return Err(e.into());
                }
                self.state = ControllerState::Waiting;
                tracing::info!(cache = %self.cache_name, "installed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(cache = %self.cache_name, error = %e, "install failed");
                self.state = ControllerState::Redundant;
                Err(e)
            }
        }
    }

    async fn fetch_manifest(&self) -> Result<Vec<CachedEntry>, CacheInstallError> {
        let mut entries = Vec::with_capacity(self.manifest.len());

        for path in &self.manifest {
            let fail = |source: FetchError| CacheInstallError::Fetch {
                path: path.clone(),
                source,
            };

            let response = self.fetcher.fetch(path).await.map_err(fail)?;
            if !response.is_success() {
                return Err(fail(FetchError::Status(response.status)));
            }
            tracing::debug!(%path, bytes = response.body.len(), "asset fetched");
            entries.push(CachedEntry::new(path, response));
        }

        Ok(entries)
    }

    /// Waiting -> Active. Returns the stale store names that were deleted.
    /// Calling it in any other state changes nothing.
    pub fn activate(&mut self) -> Result<Vec<String>, StoreError> {
        if self.state != ControllerState::Waiting {
            tracing::warn!(state = self.state.as_str(), "activate ignored");
            return Ok(Vec::new());
        }

        let evicted = if self.evict_stale {
            self.evict_stale_stores()?
        } else {
            Vec::new()
        };

        self.state = ControllerState::Active;
        tracing::info!(cache = %self.cache_name, evicted = evicted.len(), "activated");
        Ok(evicted)
    }

    fn evict_stale_stores(&self) -> Result<Vec<String>, StoreError> {
        let mut evicted = Vec::new();

        for name in self.store.cache_names()? {
            if name != self.cache_name && name.starts_with(CACHE_PREFIX) {
                if self.store.delete_cache(&name)? {
                    tracing::info!(cache = %name, "evicted stale cache");
                    evicted.push(name);
                }
            }
        }

        Ok(evicted)
    }

    /// Replaced by a newer version
    pub fn retire(&mut self) {
        self.state = ControllerState::Redundant;
    }

    /// Answer an intercepted request. Only an Active controller consults the
    /// store; otherwise the request goes straight to the network.
    pub async fn handle_fetch(&self, path: &str) -> Result<Served, FetchError> {
        if self.state == ControllerState::Active {
            match self.store.lookup(&self.cache_name, path) {
                Ok(Some(entry)) => {
                    tracing::debug!(%path, "cache hit");
                    return Ok(Served {
                        source: ResponseSource::Cache,
                        response: entry.response,
                    });
                }
                Ok(None) => tracing::debug!(%path, "cache miss"),
                Err(e) => tracing::warn!(%path, error = %e, "cache lookup failed"),
            }
        }

        let response = self.fetcher.fetch(path).await?;
        Ok(Served {
            source: ResponseSource::Network,
            response,
        })
    }
}

// ============================================================================
// REGISTRATION (one per origin)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationState {
    /// Nothing installed yet
    Idle,
    Active,
    /// A newer version is installed and waiting behind the active one
    Updating,
}

/// Holds the active controller and, during an update, the waiting one
pub struct Registration {
    fetcher: Arc<dyn Fetcher>,
    active: Option<CacheController>,
    waiting: Option<CacheController>,
}

impl Registration {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Registration {
            fetcher,
            active: None,
            waiting: None,
        }
    }

    pub fn state(&self) -> RegistrationState {
        match (&self.active, &self.waiting) {
            (_, Some(_)) => RegistrationState::Updating,
            (Some(_), None) => RegistrationState::Active,
            (None, None) => RegistrationState::Idle,
        }
    }

    pub fn active(&self) -> Option<&CacheController> {
        self.active.as_ref()
    }

    pub fn waiting(&self) -> Option<&CacheController> {
        self.waiting.as_ref()
    }

    /// Install a controller. With nothing active it activates at once;
    /// otherwise it waits until `activate_waiting`.
    pub async fn register(&mut self, mut controller: CacheController) -> Result<(), CacheInstallError> {
        if let Some(active) = &self.active {
            if active.cache_name() == controller.cache_name() {
                tracing::debug!(cache = %controller.cache_name(), "version already active");
                return Ok(());
            }
        }

        controller.install().await?;

        if self.active.is_none() {
            controller.activate()?;
            self.active = Some(controller);
        } else {
            self.waiting = Some(controller);
        }
        Ok(())
    }

    /// Promote the waiting controller (next page load). Returns evicted stores.
    pub fn activate_waiting(&mut self) -> Result<Vec<String>, StoreError> {
        let Some(mut next) = self.waiting.take() else {
            return Ok(Vec::new());
        };

        let evicted = next.activate()?;
        if let Some(mut previous) = self.active.replace(next) {
            previous.retire();
        }
        Ok(evicted)
    }

    pub async fn handle_fetch(&self, path: &str) -> Result<Served, FetchError> {
        match &self.active {
            Some(controller) => controller.handle_fetch(path).await,
            None => Ok(Served {
                source: ResponseSource::Network,
                response: self.fetcher.fetch(path).await?,
            }),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryCacheStore;
    use crate::fetch::MemoryFetcher;

    fn manifest() -> Vec<String> {
        vec!["/".to_string(), "/index.html".to_string(), "/data/businesses.json".to_string()]
    }

    fn site() -> Arc<MemoryFetcher> {
        Arc::new(
            MemoryFetcher::new()
                .with_response("/", FetchResponse::ok("text/html", "shell"))
                .with_response("/index.html", FetchResponse::ok("text/html", "shell"))
                .with_response(
                    "/data/businesses.json",
                    FetchResponse::ok("application/json", r#"{"categories":[],"businesses":[]}"#),
                )
                .with_response("/extra.txt", FetchResponse::ok("text/plain", "live")),
        )
    }

    #[tokio::test]
    async fn test_install_then_serve_offline() {
        let fetcher = site();
        let store = Arc::new(MemoryCacheStore::new());
        let mut controller = CacheController::new("jawala-cache-v1", manifest(), fetcher.clone(), store);

        controller.install().await.unwrap();
        assert_eq!(controller.state(), ControllerState::Waiting);
        controller.activate().unwrap();
        assert_eq!(controller.state(), ControllerState::Active);

        fetcher.set_offline(true);
        for path in manifest() {
            let served = controller.handle_fetch(&path).await.unwrap();
            assert_eq!(served.source, ResponseSource::Cache);
            assert!(served.response.is_success());
        }

        // outside the manifest: falls through to the (unreachable) network
        assert!(controller.handle_fetch("/extra.txt").await.is_err());
    }

    #[tokio::test]
    async fn test_miss_goes_to_network_without_write_back() {
        let fetcher = site();
        let store = Arc::new(MemoryCacheStore::new());
        let mut controller =
            CacheController::new("jawala-cache-v1", manifest(), fetcher.clone(), store.clone());
        controller.install().await.unwrap();
        controller.activate().unwrap();

        let served = controller.handle_fetch("/extra.txt").await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.text(), "live");

        assert!(store.lookup("jawala-cache-v1", "/extra.txt").unwrap().is_none());
        let again = controller.handle_fetch("/extra.txt").await.unwrap();
        assert_eq!(again.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_touch_network() {
        let fetcher = site();
        let store = Arc::new(MemoryCacheStore::new());
        let mut controller = CacheController::new("jawala-cache-v1", manifest(), fetcher.clone(), store);
        controller.install().await.unwrap();
        controller.activate().unwrap();

        let before = fetcher.request_count();
        controller.handle_fetch("/index.html").await.unwrap();
        assert_eq!(fetcher.request_count(), before);
    }

    #[tokio::test]
    async fn test_install_fails_on_missing_asset() {
        let fetcher = site();
        let store = Arc::new(MemoryCacheStore::new());
        let mut paths = manifest();
        paths.push("/assets/images/missing.png".to_string());
        let mut controller = CacheController::new("jawala-cache-v1", paths, fetcher, store.clone());

        let result = controller.install().await;

        match result {
            Err(CacheInstallError::Fetch { path, source }) => {
                assert_eq!(path, "/assets/images/missing.png");
                assert_eq!(source, FetchError::Status(404));
            }
            other => panic!("expected fetch failure, got {:?}", other),
        }
        assert_eq!(controller.state(), ControllerState::Redundant);
        assert!(!store.has_cache("jawala-cache-v1").unwrap());

        // never activates
        controller.activate().unwrap();
        assert_eq!(controller.state(), ControllerState::Redundant);
    }

    #[tokio::test]
    async fn test_install_offline_fails() {
        let fetcher = site();
        fetcher.set_offline(true);
        let mut controller =
            CacheController::new("jawala-cache-v1", manifest(), fetcher, Arc::new(MemoryCacheStore::new()));

        assert!(matches!(
            controller.install().await,
            Err(CacheInstallError::Fetch { source: FetchError::Network(_), .. })
        ));
    }

    #[tokio::test]
    async fn test_install_twice_rejected() {
        let mut controller =
            CacheController::new("jawala-cache-v1", manifest(), site(), Arc::new(MemoryCacheStore::new()));
        controller.install().await.unwrap();

        assert!(matches!(
            controller.install().await,
            Err(CacheInstallError::InvalidState("waiting"))
        ));
    }

    #[tokio::test]
    async fn test_update_evicts_old_versions() {
        let fetcher = site();
        let store = Arc::new(MemoryCacheStore::new());
        let mut registration = Registration::new(fetcher.clone());

        registration
            .register(CacheController::new("jawala-cache-v1", manifest(), fetcher.clone(), store.clone()))
            .await
            .unwrap();
        assert_eq!(registration.state(), RegistrationState::Active);

        registration
            .register(CacheController::new("jawala-cache-v2", manifest(), fetcher.clone(), store.clone()))
            .await
            .unwrap();
        assert_eq!(registration.state(), RegistrationState::Updating);
        // old version still answers while the new one waits
        assert_eq!(registration.active().map(|c| c.cache_name()), Some("jawala-cache-v1"));

        let evicted = registration.activate_waiting().unwrap();
        assert_eq!(evicted, vec!["jawala-cache-v1".to_string()]);
        assert_eq!(registration.state(), RegistrationState::Active);
        assert_eq!(store.cache_names().unwrap(), vec!["jawala-cache-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_stores_kept_when_eviction_disabled() {
        let fetcher = site();
        let store = Arc::new(MemoryCacheStore::new());
        let mut old = CacheController::new("jawala-cache-v1", manifest(), fetcher.clone(), store.clone());
        old.install().await.unwrap();
        old.activate().unwrap();

        let mut new = CacheController::new("jawala-cache-v2", manifest(), fetcher, store.clone())
            .with_eviction(false);
        new.install().await.unwrap();
        assert!(new.activate().unwrap().is_empty());

        assert_eq!(store.cache_names().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_eviction_spares_foreign_caches() {
        let fetcher = site();
        let store = Arc::new(MemoryCacheStore::new());
        store
            .put_all("other-app-v1", &[CachedEntry::new("/", FetchResponse::ok("text/html", "x"))])
            .unwrap();

        let mut controller = CacheController::new("jawala-cache-v2", manifest(), fetcher, store.clone());
        controller.install().await.unwrap();
        assert!(controller.activate().unwrap().is_empty());
        assert!(store.has_cache("other-app-v1").unwrap());
    }

    #[tokio::test]
    async fn test_resume_installed_version() {
        let fetcher = site();
        let store = Arc::new(MemoryCacheStore::new());
        let mut first = CacheController::new("jawala-cache-v1", manifest(), fetcher.clone(), store.clone());
        first.install().await.unwrap();

        // a later process with the same store
        let mut resumed = CacheController::new("jawala-cache-v1", manifest(), fetcher.clone(), store)
            .resume()
            .unwrap();
        assert_eq!(resumed.state(), ControllerState::Waiting);
        resumed.activate().unwrap();

        fetcher.set_offline(true);
        let served = resumed.handle_fetch("/").await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_resume_without_store_keeps_installing() {
        let controller =
            CacheController::new("jawala-cache-v9", manifest(), site(), Arc::new(MemoryCacheStore::new()))
                .resume()
                .unwrap();
        assert_eq!(controller.state(), ControllerState::Installing);
    }

    #[tokio::test]
    async fn test_idle_registration_uses_network() {
        let fetcher = site();
        let registration = Registration::new(fetcher);

        let served = registration.handle_fetch("/").await.unwrap();
        assert_eq!(registration.state(), RegistrationState::Idle);
        assert_eq!(served.source, ResponseSource::Network);
    }
}
