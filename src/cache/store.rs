// 💾 Cache Store - named, versioned response stores
//
// One store per cache name. Stores are disjoint: writing or deleting one
// never touches another. Entries are keyed by request path.

use crate::error::StoreError;
use crate::fetch::FetchResponse;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

// ============================================================================
// CACHED ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub path: String,
    pub response: FetchResponse,

    /// SHA-256 of the body, hex
    pub digest: String,
    pub cached_at: DateTime<Utc>,
}

impl CachedEntry {
    pub fn new(path: &str, response: FetchResponse) -> Self {
        CachedEntry {
            path: path.to_string(),
            digest: body_digest(&response.body),
            response,
            cached_at: Utc::now(),
        }
    }

    /// Body still matches the digest recorded at install time
    pub fn is_intact(&self) -> bool {
        body_digest(&self.response.body) == self.digest
    }
}

pub fn body_digest(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// STORE TRAIT
// ============================================================================

pub trait CacheStore: Send + Sync {
    /// Create `cache_name` (if needed) and write every entry, all or nothing
    fn put_all(&self, cache_name: &str, entries: &[CachedEntry]) -> Result<(), StoreError>;

    /// Cached response for `path` in `cache_name`, if any
    fn lookup(&self, cache_name: &str, path: &str) -> Result<Option<CachedEntry>, StoreError>;

    /// Every store name, sorted
    fn cache_names(&self) -> Result<Vec<String>, StoreError>;

    /// Paths held by one store, sorted
    fn keys(&self, cache_name: &str) -> Result<Vec<String>, StoreError>;

    /// Remove a whole store; false if it did not exist
    fn delete_cache(&self, cache_name: &str) -> Result<bool, StoreError>;

    fn has_cache(&self, cache_name: &str) -> Result<bool, StoreError> {
        Ok(self.cache_names()?.iter().any(|n| n == cache_name))
    }
}

// ============================================================================
// SQLITE STORE (persistent)
// ============================================================================

pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_cache_tables(&conn)?;
        Ok(SqliteCacheStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn setup_cache_tables(conn: &Connection) -> Result<(), StoreError> {
    // WAL keeps readers going while an install commits
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS caches (
            name TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cache_entries (
            cache_name TEXT NOT NULL,
            path TEXT NOT NULL,
            status INTEGER NOT NULL,
            headers TEXT NOT NULL,
            body BLOB NOT NULL,
            digest TEXT NOT NULL,
            cached_at TEXT NOT NULL,
            PRIMARY KEY (cache_name, path)
        )",
        [],
    )?;

    Ok(())
}

impl CacheStore for SqliteCacheStore {
    fn put_all(&self, cache_name: &str, entries: &[CachedEntry]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
            params![cache_name, Utc::now().to_rfc3339()],
        )?;

        for entry in entries {
            let headers = serde_json::to_string(&entry.response.headers)?;
            tx.execute(
                "INSERT OR REPLACE INTO cache_entries
                    (cache_name, path, status, headers, body, digest, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    cache_name,
                    entry.path,
                    entry.response.status,
                    headers,
                    entry.response.body,
                    entry.digest,
                    entry.cached_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn lookup(&self, cache_name: &str, path: &str) -> Result<Option<CachedEntry>, StoreError> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT status, headers, body, digest, cached_at
                 FROM cache_entries WHERE cache_name = ?1 AND path = ?2",
                params![cache_name, path],
                |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, headers, body, digest, cached_at)) = row else {
            return Ok(None);
        };

        Ok(Some(CachedEntry {
            path: path.to_string(),
            response: FetchResponse {
                status,
                headers: serde_json::from_str(&headers)?,
                body,
            },
            digest,
            cached_at: DateTime::parse_from_rfc3339(&cached_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }))
    }

    fn cache_names(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn keys(&self, cache_name: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT path FROM cache_entries WHERE cache_name = ?1 ORDER BY path")?;
        let paths = stmt
            .query_map(params![cache_name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(paths)
    }

    fn delete_cache(&self, cache_name: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM cache_entries WHERE cache_name = ?1",
            params![cache_name],
        )?;
        let removed = tx.execute("DELETE FROM caches WHERE name = ?1", params![cache_name])?;
        tx.commit()?;
        Ok(removed > 0)
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Default)]
pub struct MemoryCacheStore {
    caches: RwLock<BTreeMap<String, BTreeMap<String, CachedEntry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn put_all(&self, cache_name: &str, entries: &[CachedEntry]) -> Result<(), StoreError> {
        let mut caches = self.caches.write().map_err(|_| StoreError::Poisoned)?;
        let cache = caches.entry(cache_name.to_string()).or_default();
        for entry in entries {
            cache.insert(entry.path.clone(), entry.clone());
        }
        Ok(())
    }

    fn lookup(&self, cache_name: &str, path: &str) -> Result<Option<CachedEntry>, StoreError> {
        let caches = self.caches.read().map_err(|_| StoreError::Poisoned)?;
        Ok(caches.get(cache_name).and_then(|c| c.get(path)).cloned())
    }

    fn cache_names(&self) -> Result<Vec<String>, StoreError> {
        let caches = self.caches.read().map_err(|_| StoreError::Poisoned)?;
        Ok(caches.keys().cloned().collect())
    }

    fn keys(&self, cache_name: &str) -> Result<Vec<String>, StoreError> {
        let caches = self.caches.read().map_err(|_| StoreError::Poisoned)?;
        Ok(caches
            .get(cache_name)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn delete_cache(&self, cache_name: &str) -> Result<bool, StoreError> {
        let mut caches = self.caches.write().map_err(|_| StoreError::Poisoned)?;
        Ok(caches.remove(cache_name).is_some())
    }
}

// ============================================================================
// TESTS
// ============================================================================
