// ⚙️ Configuration - Config as Data
// Well-known paths, cache identity and the offline manifest.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix shared by every versioned cache store name
pub const CACHE_PREFIX: &str = "jawala-cache-";

// ============================================================================
// DIRECTORY CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Origin the site is served from (e.g. "http://localhost:3000")
    pub base_url: String,

    /// Well-known path of the catalog document
    pub catalog_path: String,

    /// Versioned cache store name; a new value creates a disjoint store
    pub cache_name: String,

    /// Assets that must all be cacheable at install time (ordered)
    pub manifest: Vec<String>,

    /// SQLite file backing the persistent cache
    pub cache_db: PathBuf,

    /// Drop older `jawala-cache-*` stores when a new version activates
    pub evict_stale_caches: bool,

    /// Public URL appended to shared business details
    pub site_url: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig {
            base_url: "http://localhost:3000".to_string(),
            catalog_path: "/data/businesses.json".to_string(),
            cache_name: format!("{}v3v1", CACHE_PREFIX),
            manifest: default_manifest(),
            cache_db: PathBuf::from("jawala-cache.db"),
            evict_stale_caches: true,
            site_url: "https://jawala-vyapar.vercel.app/".to_string(),
        }
    }
}

/// Page shell, styles, script, data document and the key image
pub fn default_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/assets/css/styles.css",
        "/assets/js/script.js",
        "/data/businesses.json",
        "/assets/images/telephone-directory.png",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl DirectoryConfig {
    /// Load config from JSON file (missing fields keep their defaults)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: DirectoryConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// Environment overrides: JAWALA_BASE_URL, JAWALA_CACHE_DB
    pub fn apply_env(mut self) -> Self {
        if let Ok(base_url) = std::env::var("JAWALA_BASE_URL") {
            self.base_url = base_url;
        }
        if let Ok(cache_db) = std::env::var("JAWALA_CACHE_DB") {
            self.cache_db = PathBuf::from(cache_db);
        }
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================
