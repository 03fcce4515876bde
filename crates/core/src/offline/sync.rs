use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::Url;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{
    missing_shell_assets, network::Network, storage::CacheStorage, CachePolicy, DiskCacheStorage,
    Handled, HttpNetwork, OfflineShell, Request, ResponseSource,
};
use crate::config::AppConfig;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Events emitted by the background shell synchroniser.
#[derive(Debug)]
pub enum ShellEvent {
    /// Install and activation finished.
    Ready {
        /// Entries written by the install step. Zero when the install was incomplete.
        cached: usize,
        /// Cache generations deleted on activation.
        purged: Vec<String>,
        /// Where the root document was answered from.
        source: ResponseSource,
    },
    /// Sync failed with an error.
    Error(anyhow::Error),
}

/// Installs and activates the app shell, then probes the root document.
pub struct ShellSync<S, N> {
    shell: OfflineShell<S, N>,
}

impl ShellSync<DiskCacheStorage, HttpNetwork> {
    /// Disk-backed synchroniser for the configured origin, or `None` when no origin is set.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>> {
        let Some(origin) = config.shell.origin.as_deref() else {
            return Ok(None);
        };
        let origin = Url::parse(origin).with_context(|| format!("invalid shell origin {origin}"))?;
        let policy = CachePolicy::new(origin)
            .with_cache_name(config.shell.cache_name.clone())
            .with_app_shell(config.shell.app_shell.iter().cloned())
            .with_bypass_pattern(&config.shell.bypass_pattern)
            .context("invalid shell bypass pattern")?;

        if let Some(public_dir) = &config.shell.public_dir {
            let missing = missing_shell_assets(public_dir, policy.app_shell());
            if !missing.is_empty() {
                warn!(
                    public_dir = %public_dir.display(),
                    missing = ?missing,
                    "app shell references files that are not published"
                );
            }
        }

        let storage = Arc::new(DiskCacheStorage::new(config.cache_root.clone()));
        let network = Arc::new(HttpNetwork::new(FETCH_TIMEOUT)?);
        Ok(Some(Self::new(OfflineShell::new(policy, storage, network))))
    }
}

impl<S: CacheStorage, N: Network> ShellSync<S, N> {
    /// Wrap an existing shell.
    pub fn new(shell: OfflineShell<S, N>) -> Self {
        Self { shell }
    }

    /// Run one install/activate/probe cycle, sending the outcome to `sender`.
    pub async fn run(self, sender: mpsc::Sender<ShellEvent>) -> Result<()> {
        let report = self.shell.install().await;
        if !report.failed.is_empty() {
            warn!(failed = ?report.failed, "app shell install incomplete");
        }

        let purged = match self.shell.activate().await {
            Ok(purged) => purged,
            Err(err) => {
                let _ = sender
                    .send(ShellEvent::Error(
                        anyhow::Error::new(err).context("failed to activate cache generation"),
                    ))
                    .await;
                return Ok(());
            }
        };

        let Some(root) = self.shell.policy().resolve("/") else {
            let _ = sender
                .send(ShellEvent::Error(anyhow::anyhow!("shell origin has no root")))
                .await;
            return Ok(());
        };

        match self.shell.handle(&Request::navigate(root)).await {
            Ok(Handled::Served(served)) => {
                info!(
                    cached = report.cached,
                    purged = purged.len(),
                    source = ?served.source,
                    "app shell ready"
                );
                sender
                    .send(ShellEvent::Ready {
                        cached: report.cached,
                        purged,
                        source: served.source,
                    })
                    .await
                    .context("failed to send shell ready event")?;
            }
            Ok(Handled::Passthrough) => {
                let _ = sender
                    .send(ShellEvent::Error(anyhow::anyhow!(
                        "root document is not part of the app shell"
                    )))
                    .await;
            }
            Err(err) => {
                let _ = sender
                    .send(ShellEvent::Error(
                        anyhow::Error::new(err).context("app shell unavailable"),
                    ))
                    .await;
            }
        }

        Ok(())
    }
}
