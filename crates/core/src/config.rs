//! Application configuration.
//!
//! Values are layered: built-in defaults, then the optional JSON file at
//! [`AppConfig::default_path`], then `GUANDAN_*` environment variables (nested keys use `__`,
//! e.g. `GUANDAN_SHELL__ORIGIN=https://score.example`).

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    gesture::{NEXT_ROUND_HOLD, RENAME_HOLD},
    offline::{DEFAULT_APP_SHELL, DEFAULT_BYPASS_PATTERN, DEFAULT_CACHE_NAME},
    save::{StateFile, DEFAULT_STATE_DIR},
};

/// File name of the configuration document.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "GUANDAN";

/// Runtime configuration for the scoreboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the board document lives.
    pub state_path: PathBuf,
    /// Root directory for offline cache generations.
    pub cache_root: PathBuf,
    /// Offline app-shell settings.
    pub shell: ShellConfig,
    /// Hold thresholds.
    pub gestures: GestureConfig,
    /// How long transient hints stay on screen, in milliseconds.
    pub hint_ms: u64,
    /// UI tick interval, in milliseconds.
    pub tick_ms: u64,
}

/// Offline app-shell settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Origin serving the app shell. No sync runs when unset.
    pub origin: Option<String>,
    /// Name of the current cache generation.
    pub cache_name: String,
    /// Paths cached at install time and served stale-while-revalidate.
    pub app_shell: Vec<String>,
    /// Paths matching this pattern are never intercepted.
    pub bypass_pattern: String,
    /// Local copy of the served files, checked against `app_shell` at startup.
    pub public_dir: Option<PathBuf>,
}

/// Hold thresholds in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Next-round hold.
    pub next_round_hold_ms: u64,
    /// Team-name hold.
    pub rename_hold_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_STATE_DIR);
        let cache_root = dirs::cache_dir()
            .map(|dir| dir.join(DEFAULT_STATE_DIR))
            .unwrap_or_else(|| data_root.join("cache"));
        Self {
            state_path: StateFile::default_path(),
            cache_root,
            shell: ShellConfig::default(),
            gestures: GestureConfig::default(),
            hint_ms: 1100,
            tick_ms: 50,
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            origin: None,
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            app_shell: DEFAULT_APP_SHELL.iter().map(|path| path.to_string()).collect(),
            bypass_pattern: DEFAULT_BYPASS_PATTERN.to_string(),
            public_dir: None,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            next_round_hold_ms: NEXT_ROUND_HOLD.as_millis() as u64,
            rename_hold_ms: RENAME_HOLD.as_millis() as u64,
        }
    }
}

impl GestureConfig {
    /// Next-round hold threshold.
    pub fn next_round_hold(&self) -> Duration {
        Duration::from_millis(self.next_round_hold_ms)
    }

    /// Team-name hold threshold.
    pub fn rename_hold(&self) -> Duration {
        Duration::from_millis(self.rename_hold_ms)
    }
}

impl AppConfig {
    /// Default configuration file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_STATE_DIR)
            .join(CONFIG_FILE_NAME)
    }

    /// Load from the default location plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load from `path` (if it exists) plus environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = serde_json::to_string(&Self::default())
            .context("failed to serialize default configuration")?;
        let loaded: Self = Config::builder()
            .add_source(File::from_str(&defaults, FileFormat::Json))
            .add_source(File::from(path).format(FileFormat::Json).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?
            .try_deserialize()
            .context("invalid configuration")?;
        Ok(loaded)
    }

    /// Hint display duration.
    pub fn hint_duration(&self) -> Duration {
        Duration::from_millis(self.hint_ms)
    }

    /// UI tick interval.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }
}

/// Write the default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = AppConfig::default_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(&AppConfig::default())
        .context("failed to serialize default configuration")?;
    fs::write(path, serialized)
        .with_context(|| format!("failed to write config {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join(CONFIG_FILE_NAME))?;
        assert_eq!(config.hint_ms, 1100);
        assert_eq!(config.gestures.next_round_hold(), NEXT_ROUND_HOLD);
        assert_eq!(config.gestures.rename_hold(), RENAME_HOLD);
        assert_eq!(config.shell.cache_name, DEFAULT_CACHE_NAME);
        assert_eq!(config.shell.app_shell.len(), DEFAULT_APP_SHELL.len());
        assert!(config.shell.origin.is_none());
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{
                "hint_ms": 2000,
                "state_path": "/tmp/board.json",
                "shell": { "origin": "http://localhost:3000", "cache_name": "guandan-web-v3" },
                "gestures": { "next_round_hold_ms": 800 }
            }"#,
        )?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.hint_duration(), Duration::from_millis(2000));
        assert_eq!(config.state_path, PathBuf::from("/tmp/board.json"));
        assert_eq!(config.shell.origin.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.shell.cache_name, "guandan-web-v3");
        assert_eq!(config.shell.bypass_pattern, DEFAULT_BYPASS_PATTERN);
        assert_eq!(config.gestures.next_round_hold_ms, 800);
        assert_eq!(config.gestures.rename_hold_ms, 500);
        Ok(())
    }

    #[test]
    fn default_file_is_written_once() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cfg").join(CONFIG_FILE_NAME);
        write_default_config(&path)?;
        let written = fs::read_to_string(&path)?;
        assert!(written.contains("cache_name"));

        fs::write(&path, "{\"hint_ms\": 5}")?;
        write_default_config(&path)?;
        assert_eq!(fs::read_to_string(&path)?, "{\"hint_ms\": 5}");
        Ok(())
    }
}
