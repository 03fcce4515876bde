use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Method, Url};

use super::{Request, RequestMode, DEFAULT_APP_SHELL, DEFAULT_BYPASS_PATTERN, DEFAULT_CACHE_NAME};

static DEFAULT_BYPASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_BYPASS_PATTERN).expect("invalid bypass regex"));

/// Strategy selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; the request goes to the network untouched.
    Passthrough,
    /// Cache first, refreshed in the background.
    AppShell,
    /// Network first, falling back to the cache and then the cached root document.
    Navigation,
}

/// Per-request routing rules for the offline shell.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    origin: Url,
    cache_name: String,
    app_shell: Vec<String>,
    bypass: Regex,
}

impl CachePolicy {
    /// Policy for `origin` with the default cache name, app shell, and bypass namespace.
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            app_shell: DEFAULT_APP_SHELL.iter().map(|path| path.to_string()).collect(),
            bypass: DEFAULT_BYPASS.clone(),
        }
    }

    /// Use a different cache generation name.
    pub fn with_cache_name(mut self, cache_name: impl Into<String>) -> Self {
        self.cache_name = cache_name.into();
        self
    }

    /// Replace the app-shell path set.
    pub fn with_app_shell<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.app_shell = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the never-intercepted namespace.
    pub fn with_bypass_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.bypass = Regex::new(pattern)?;
        Ok(self)
    }

    /// Origin whose requests are intercepted.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Name of the live cache generation.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// App-shell paths.
    pub fn app_shell(&self) -> &[String] {
        &self.app_shell
    }

    /// Absolute URL of `path` on the origin.
    pub fn resolve(&self, path: &str) -> Option<Url> {
        self.origin.join(path).ok()
    }

    /// Pick the strategy for `request`.
    pub fn route(&self, request: &Request) -> Route {
        if request.method != Method::GET {
            return Route::Passthrough;
        }
        if request.url.origin() != self.origin.origin() {
            return Route::Passthrough;
        }

        let path = request.url.path();
        if self.bypass.is_match(path) {
            return Route::Passthrough;
        }
        if self.app_shell.iter().any(|entry| entry == path) {
            return Route::AppShell;
        }
        if request.mode == RequestMode::Navigate {
            return Route::Navigation;
        }
        Route::Passthrough
    }
}
