mod app;
mod devices;
mod labels;
mod level_font;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use guandan_core::{
    config::{self, AppConfig},
    offline::ShellSync,
    Scoreboard, StateFile,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::devices::{InhibitWakeLock, TerminalBell};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    info!(state = %config.state_path.display(), "starting scoreboard");

    let board = Scoreboard::open(
        Box::new(StateFile::new(config.state_path.clone())),
        Box::new(TerminalBell),
        Box::new(InhibitWakeLock::default()),
    );
    let mut app = app::ScoreboardApp::new(board, &config);

    match ShellSync::from_config(&config) {
        Ok(Some(sync)) => {
            let (sync_tx, sync_rx) = mpsc::channel(8);
            tokio::spawn(async move {
                if let Err(err) = sync.run(sync_tx).await {
                    tracing::error!("Offline shell sync task error: {err}");
                }
            });
            app.attach_sync(sync_rx);
        }
        Ok(None) => info!("no shell origin configured; offline sync disabled"),
        Err(err) => warn!(error = %err, "offline shell disabled"),
    }

    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("guandan.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
