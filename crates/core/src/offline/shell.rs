use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{
    network::Network, storage::CacheStorage, CacheError, CachePolicy, OfflineError, Request,
    Response, ResponseSource, Route,
};

/// Outcome of intercepting a request.
#[derive(Debug)]
pub enum Handled {
    /// Not intercepted; the caller should fetch normally.
    Passthrough,
    /// Answered by the shell.
    Served(Served),
}

/// A response answered by the shell.
#[derive(Debug)]
pub struct Served {
    /// The response to hand back.
    pub response: Response,
    /// Where it came from.
    pub source: ResponseSource,
    /// Background revalidation started for a cache hit, if any.
    pub refresh: Option<JoinHandle<()>>,
}

/// Result of pre-caching the app shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Number of entries written to the cache.
    pub cached: usize,
    /// App-shell paths that could not be fetched.
    pub failed: Vec<String>,
}

/// Request interceptor that keeps the app shell usable offline.
pub struct OfflineShell<S, N> {
    policy: Arc<CachePolicy>,
    storage: Arc<S>,
    network: Arc<N>,
}

impl<S, N> Clone for OfflineShell<S, N> {
    fn clone(&self) -> Self {
        Self {
            policy: Arc::clone(&self.policy),
            storage: Arc::clone(&self.storage),
            network: Arc::clone(&self.network),
        }
    }
}

impl<S: CacheStorage, N: Network> OfflineShell<S, N> {
    /// Combine a policy with its storage and network.
    pub fn new(policy: CachePolicy, storage: Arc<S>, network: Arc<N>) -> Self {
        Self {
            policy: Arc::new(policy),
            storage,
            network,
        }
    }

    /// Routing rules in use.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Pre-cache every app-shell path. All-or-nothing: if any path fails, nothing is stored.
    /// Failures are reported, never raised.
    pub async fn install(&self) -> InstallReport {
        let mut fetched = Vec::new();
        let mut failed = Vec::new();

        for path in self.policy.app_shell() {
            let Some(url) = self.policy.resolve(path) else {
                warn!(path = %path, "app shell path does not resolve against origin");
                failed.push(path.clone());
                continue;
            };
            let request = Request::get(url);
            match self.network.fetch(&request).await {
                Ok(response) if response.is_success() => fetched.push((request, response)),
                Ok(response) => {
                    warn!(path = %path, status = response.status, "app shell fetch rejected");
                    failed.push(path.clone());
                }
                Err(err) => {
                    warn!(path = %path, error = %err, "app shell fetch failed");
                    failed.push(path.clone());
                }
            }
        }

        if !failed.is_empty() {
            return InstallReport { cached: 0, failed };
        }

        let mut cached = 0;
        for (request, response) in fetched {
            let key = request.cache_key();
            let stored = {
                let key = key.clone();
                self.blocking(move |storage, cache| storage.store(cache, &key, &response))
                    .await
            };
            match stored {
                Ok(()) => cached += 1,
                Err(err) => warn!(key = %key, error = %err, "app shell write failed"),
            }
        }
        info!(cache = self.policy.cache_name(), cached, "app shell installed");
        InstallReport { cached, failed }
    }

    /// Delete every cache generation except the current one. Returns the deleted names.
    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        let purged = self
            .blocking(|storage, current| {
                let mut purged = Vec::new();
                for name in storage.cache_names()? {
                    if name != current && storage.delete_cache(&name)? {
                        purged.push(name);
                    }
                }
                Ok(purged)
            })
            .await?;
        for name in &purged {
            info!(cache = %name, "purged stale cache generation");
        }
        Ok(purged)
    }

    /// Answer `request` according to the policy.
    pub async fn handle(&self, request: &Request) -> Result<Handled, OfflineError> {
        let served = match self.policy.route(request) {
            Route::Passthrough => return Ok(Handled::Passthrough),
            Route::AppShell => self.stale_while_revalidate(request).await?,
            Route::Navigation => self.network_first(request).await?,
        };
        Ok(Handled::Served(served))
    }

    async fn stale_while_revalidate(&self, request: &Request) -> Result<Served, OfflineError> {
        let key = request.cache_key();
        if let Some(response) = self.cached(&key).await {
            let refresh = self.spawn_refresh(request.clone());
            return Ok(Served {
                response,
                source: ResponseSource::Cache,
                refresh: Some(refresh),
            });
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.remember(&key, &response).await;
                Ok(Served {
                    response,
                    source: ResponseSource::Network,
                    refresh: None,
                })
            }
            Err(source) => Err(OfflineError::Unavailable { key, source }),
        }
    }

    async fn network_first(&self, request: &Request) -> Result<Served, OfflineError> {
        let key = request.cache_key();
        let err = match self.network.fetch(request).await {
            Ok(response) => {
                self.remember(&key, &response).await;
                return Ok(Served {
                    response,
                    source: ResponseSource::Network,
                    refresh: None,
                });
            }
            Err(err) => err,
        };

        debug!(key = %key, error = %err, "navigation offline; falling back to cache");
        let fallback = match self.cached(&key).await {
            Some(response) => Some(response),
            None => self.cached_root().await,
        };
        match fallback {
            Some(response) => Ok(Served {
                response,
                source: ResponseSource::Cache,
                refresh: None,
            }),
            None => Err(OfflineError::Unavailable { key, source: err }),
        }
    }

    fn spawn_refresh(&self, request: Request) -> JoinHandle<()> {
        let shell = self.clone();
        tokio::spawn(async move {
            match shell.network.fetch(&request).await {
                Ok(response) => shell.remember(&request.cache_key(), &response).await,
                Err(err) => {
                    debug!(key = %request.cache_key(), error = %err, "background refresh failed")
                }
            }
        })
    }

    /// Run a storage operation on the blocking pool against the current generation.
    async fn blocking<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&S, &str) -> Result<T, CacheError> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let cache = self.policy.cache_name().to_string();
        tokio::task::spawn_blocking(move || op(&storage, &cache)).await?
    }

    async fn cached(&self, key: &str) -> Option<Response> {
        let owned = key.to_string();
        match self
            .blocking(move |storage, cache| storage.lookup(cache, &owned))
            .await
        {
            Ok(found) => found,
            Err(err) => {
                warn!(key, error = %err, "cache lookup failed; treating as miss");
                None
            }
        }
    }

    async fn cached_root(&self) -> Option<Response> {
        let root = self.policy.resolve("/").map(Request::get)?;
        self.cached(&root.cache_key()).await
    }

    async fn remember(&self, key: &str, response: &Response) {
        if !response.is_success() {
            return;
        }
        let owned = key.to_string();
        let response = response.clone();
        if let Err(err) = self
            .blocking(move |storage, cache| storage.store(cache, &owned, &response))
            .await
        {
            warn!(key, error = %err, "cache write failed");
        }
    }
}

/// App-shell paths with no backing file under `public_dir`. `/` is served by `index.html`.
pub fn missing_shell_assets(public_dir: &Path, app_shell: &[String]) -> Vec<String> {
    let present: BTreeSet<PathBuf> = WalkDir::new(public_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(public_dir)
                .ok()
                .map(Path::to_path_buf)
        })
        .collect();

    app_shell
        .iter()
        .filter(|path| {
            let relative = path.trim_start_matches('/');
            let expected = if relative.is_empty() || relative.ends_with('/') {
                PathBuf::from(relative).join("index.html")
            } else {
                PathBuf::from(relative)
            };
            !present.contains(&expected)
        })
        .cloned()
        .collect()
}
