//! Offline availability of the app shell.
//!
//! [`OfflineShell`] decides, per request, whether to answer from the cache, from the network,
//! or from a cache-then-revalidate mix, and manages the single live cache generation.

mod disk;
mod network;
mod policy;
mod shell;
mod storage;
mod sync;

use std::path::PathBuf;

use reqwest::{Method, Url};
use thiserror::Error;

pub use disk::DiskCacheStorage;
pub use network::{HttpNetwork, Network};
pub use policy::{CachePolicy, Route};
pub use shell::{missing_shell_assets, Handled, InstallReport, OfflineShell, Served};
pub use storage::{CacheStorage, MemoryCacheStorage};
pub use sync::{ShellEvent, ShellSync};

/// Name of the current cache generation. Bump it to retire older generations on activation.
pub const DEFAULT_CACHE_NAME: &str = "guandan-web-v2";

/// Files the interface needs to boot without a network.
pub const DEFAULT_APP_SHELL: [&str; 5] = [
    "/",
    "/manifest.webmanifest",
    "/icon-192.png",
    "/icon-512.png",
    "/apple-touch-icon.png",
];

/// Build and dev-runtime assets. Stale copies of these break a running app, so they always go
/// straight to the network.
pub const DEFAULT_BYPASS_PATTERN: &str = r"^/(?:_next/|__next)";

/// How a request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    /// Sub-resource fetch.
    Other,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: Url,
    /// Initiator.
    pub mode: RequestMode,
}

impl Request {
    /// Plain GET for a sub-resource.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::Other,
        }
    }

    /// Top-level navigation to `url`.
    pub fn navigate(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::Navigate,
        }
    }

    /// Key under which the response is cached: path plus query.
    pub fn cache_key(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

/// A network or cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, when present.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// 200 response with the given body.
    pub fn ok(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.into()),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx. Only successful responses are written into the cache.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// The cache generation.
    Cache,
    /// A live network fetch.
    Network,
}

/// Transport-level fetch failure. HTTP error statuses are not network errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The request never produced a response.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying failure.
        message: String,
    },
}

/// Cache storage failure.
#[derive(Debug, Error)]
pub enum CacheError {
    /// File system failure.
    #[error("cache i/o failed at {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The generation index could not be read or written.
    #[error("cache index {} is unreadable: {source}", .path.display())]
    Index {
        /// Index path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// The blocking storage task panicked or was cancelled.
    #[error("cache storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A request that neither the network nor the cache could answer.
#[derive(Debug, Error)]
pub enum OfflineError {
    /// Network failed and no cached fallback exists.
    #[error("{key} is unavailable offline")]
    Unavailable {
        /// Cache key of the request.
        key: String,
        /// The network failure that triggered the fallback.
        #[source]
        source: NetworkError,
    },
}
