// End-to-end flows: page load -> filter -> shared link, and offline cache

use jawala_directory::{
    cache::{CacheController, CacheStore, ControllerState, ResponseSource, SqliteCacheStore},
    dedupe, initial_selection, selection, view, AtomicLoadingFlag, CatalogError, CatalogStore,
    CategoryIndex, DirectoryConfig, FetchResponse, FilterOutcome, FilterState, History,
    MemoryFetcher, MemoryHistory,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SAMPLE: &str = include_str!("../site/data/businesses.json");

fn site_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("site")
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Every file under `site/`, addressed the way the static server maps them:
/// `/a/b.css` for files, `/dir/` for a directory holding index.html
fn add_site_files(fetcher: &MemoryFetcher, dir: &Path, prefix: &str) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();

        if path.is_dir() {
            add_site_files(fetcher, &path, &format!("{}{}/", prefix, name));
            continue;
        }

        let response = FetchResponse::ok(content_type(&path), std::fs::read(&path).unwrap());
        if name == "index.html" {
            fetcher.insert(prefix, response.clone());
        }
        fetcher.insert(&format!("{}{}", prefix, name), response);
    }
}

fn site_fetcher() -> MemoryFetcher {
    let fetcher = MemoryFetcher::new();
    add_site_files(&fetcher, &site_root(), "/");
    fetcher
}

#[tokio::test]
async fn test_shared_link_reproduces_filtered_view() {
    let config = DirectoryConfig::default();
    let flag = AtomicLoadingFlag::new();
    let catalog = CatalogStore::new(site_fetcher(), &config.catalog_path)
        .load(&flag)
        .await
        .unwrap();
    let index = CategoryIndex::build(&catalog.categories);

    // user picks a category; address bar is rewritten in place
    let mut history = MemoryHistory::new("/");
    selection::sync_selection(&mut history, Some("grocery"));
    let shared = history.location().href();
    assert_eq!(shared, "/?cat=grocery");

    // someone opens the link
    let opened = MemoryHistory::new(&shared);
    let seeded = initial_selection(&opened.location().query, &catalog, &index);
    assert_eq!(seeded.category.map(|c| c.id.as_str()), Some("grocery"));
    assert_eq!(seeded.grid_position, 1);

    let state = FilterState::default().with_category(seeded.category.map(|c| c.id.as_str()));
    match view(&catalog, &state) {
        FilterOutcome::Flat { businesses } => {
            assert_eq!(businesses.len(), 2);
            assert!(businesses.iter().all(|b| b.category == "grocery"));
        }
        other => panic!("expected flat list, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unfiltered_view_groups_every_business_once() {
    let config = DirectoryConfig::default();
    let catalog = CatalogStore::new(site_fetcher(), &config.catalog_path)
        .load(&AtomicLoadingFlag::new())
        .await
        .unwrap();

    assert_eq!(dedupe(&catalog.categories).len(), catalog.categories.len() + 1);

    let outcome = view(&catalog, &FilterState::default());
    assert_eq!(outcome.count(), catalog.businesses.len());

    // search by owner surname spans two categories
    let outcome = view(&catalog, &FilterState::new(None, "पाटील"));
    match outcome {
        FilterOutcome::Grouped { groups } => {
            let ids: Vec<_> = groups.iter().map(|g| g.category_id.as_str()).collect();
            assert_eq!(ids, vec!["medical", "grocery"]);
        }
        other => panic!("expected groups, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_catalog_reports_once() {
    let fetcher = MemoryFetcher::new();
    fetcher.set_offline(true);
    let flag = AtomicLoadingFlag::new();

    let err = CatalogStore::new(fetcher, "/data/businesses.json")
        .load(&flag)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Transport { .. }));
    assert!(err.user_message().contains("डेटा लोड करण्यात त्रुटी आली"));
    assert!(!flag.is_active());
}

#[tokio::test]
async fn test_offline_after_install_with_persistent_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = DirectoryConfig::default();
    config.cache_db = dir.path().join("cache.db");

    let fetcher = Arc::new(site_fetcher());
    fetcher.insert("/about.html", FetchResponse::ok("text/html", "about"));

    {
        let store: Arc<dyn CacheStore> = Arc::new(SqliteCacheStore::open(&config.cache_db).unwrap());
        let mut controller = CacheController::from_config(&config, fetcher.clone(), store);
        controller.install().await.unwrap();
        controller.activate().unwrap();
        assert_eq!(controller.state(), ControllerState::Active);
    }

    // new process, network gone
    fetcher.set_offline(true);
    let store: Arc<dyn CacheStore> = Arc::new(SqliteCacheStore::open(&config.cache_db).unwrap());
    let mut controller = CacheController::from_config(&config, fetcher.clone(), store).resume().unwrap();
    controller.activate().unwrap();

    for path in &config.manifest {
        let served = controller.handle_fetch(path).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
    }

    let catalog_doc = controller.handle_fetch(&config.catalog_path).await.unwrap();
    assert_eq!(catalog_doc.response.text(), SAMPLE);

    assert!(controller.handle_fetch("/about.html").await.is_err());
}

#[tokio::test]
async fn test_install_from_shipped_site() {
    let config = DirectoryConfig::default();
    let fetcher = Arc::new(site_fetcher());
    let store: Arc<dyn CacheStore> = Arc::new(SqliteCacheStore::in_memory().unwrap());

    let mut controller = CacheController::from_config(&config, fetcher.clone(), store.clone());
    controller.install().await.unwrap();
    controller.activate().unwrap();
    assert_eq!(store.keys(&config.cache_name).unwrap().len(), config.manifest.len());

    fetcher.set_offline(true);

    let shell = controller.handle_fetch("/").await.unwrap();
    let index_html = std::fs::read(site_root().join("index.html")).unwrap();
    assert_eq!(shell.source, ResponseSource::Cache);
    assert_eq!(shell.response.body, index_html);
    assert_eq!(shell.response.content_type(), Some("text/html"));

    // every asset the shell references is available offline
    let html = String::from_utf8(index_html).unwrap();
    for asset in ["/assets/css/styles.css", "/assets/js/script.js", "/assets/images/telephone-directory.png"] {
        assert!(html.contains(asset), "shell does not reference {}", asset);
        assert!(controller.handle_fetch(asset).await.unwrap().response.is_success());
    }

    let image = controller.handle_fetch("/assets/images/telephone-directory.png").await.unwrap();
    assert!(image.response.body.starts_with(b"\x89PNG"));
}
