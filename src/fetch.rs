// 🌐 Network Seam
// Everything that leaves the process goes through `Fetcher`.
//
// Implementations:
// - HttpFetcher: real network via reqwest, paths resolved against an origin
// - MemoryFetcher: fixed responses, can be switched offline (tests, demos)

use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use url::Url;

// ============================================================================
// RESPONSE
// ============================================================================

/// A response as it came off the wire. Headers keep their order; names are
/// stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        FetchResponse {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
        .with_header("content-type", content_type)
    }

    pub fn with_status(status: u16) -> Self {
        FetchResponse {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Builder pattern: append a header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// First value of `name`, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ============================================================================
// FETCHER TRAIT
// ============================================================================

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a site-relative path. A non-2xx response is still `Ok`;
    /// callers decide whether the status is acceptable.
    async fn fetch(&self, path: &str) -> Result<FetchResponse, FetchError>;
}

// ============================================================================
// HTTP FETCHER
// ============================================================================

pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Self {
        // `join` replaces the last segment of a base without a trailing slash
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        HttpFetcher {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Resolve `path` the way a page would: `/x` is origin-relative,
    /// `x` and `./x` are relative to the base, absolute URLs pass through.
    fn url_for(&self, path: &str) -> Result<Url, FetchError> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(path))
            .map_err(|e| FetchError::InvalidUrl(format!("{} (base {}): {}", path, self.base_url, e)))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, FetchError> {
        let url = self.url_for(path)?;
        tracing::debug!(%url, "network fetch");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        // Values that are not visible ASCII are dropped
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?
            .to_vec();

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// MEMORY FETCHER
// ============================================================================

/// In-memory network: unknown paths answer 404, offline mode fails every request
#[derive(Default)]
pub struct MemoryFetcher {
    responses: RwLock<HashMap<String, FetchResponse>>,
    offline: AtomicBool,
    requests: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: add a fixed response
    pub fn with_response(self, path: &str, response: FetchResponse) -> Self {
        self.insert(path, response);
        self
    }

    pub fn insert(&self, path: &str, response: FetchResponse) {
        if let Ok(mut responses) = self.responses.write() {
            responses.insert(path.to_string(), response);
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests that reached the network layer
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Network("network unreachable".to_string()));
        }

        let responses = self
            .responses
            .read()
            .map_err(|_| FetchError::Network("fetcher poisoned".to_string()))?;

        Ok(responses
            .get(path)
            .cloned()
            .unwrap_or_else(|| FetchResponse::with_status(404)))
    }
}

// ============================================================================
// TESTS
// ============================================================================
