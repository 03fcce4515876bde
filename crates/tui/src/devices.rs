//! Terminal-side implementations of the scoreboard collaborators.

use std::{
    io::{self, Write},
    process::Stdio,
};

use anyhow::{Context, Result};
use guandan_core::{Cue, CuePlayer, WakeLock};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Rings the terminal bell; the number of rings tells the cues apart.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl TerminalBell {
    fn rings(cue: Cue) -> usize {
        match cue {
            Cue::LevelUp | Cue::WinChange | Cue::StageToggle => 1,
            Cue::LevelDown | Cue::NextRoundHint => 2,
            Cue::NextRoundClear => 3,
        }
    }
}

impl CuePlayer for TerminalBell {
    fn play(&mut self, cue: Cue) -> Result<()> {
        let bells = "\x07".repeat(Self::rings(cue));
        let mut stdout = io::stdout();
        stdout
            .write_all(bells.as_bytes())
            .and_then(|()| stdout.flush())
            .with_context(|| format!("failed to ring bell for {}", cue.name()))
    }
}

/// Keeps the machine awake by holding a `systemd-inhibit` child process.
#[derive(Debug)]
pub struct InhibitWakeLock {
    program: String,
    child: Option<Child>,
}

impl Default for InhibitWakeLock {
    fn default() -> Self {
        Self::new("systemd-inhibit")
    }
}

impl InhibitWakeLock {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            child: None,
        }
    }
}

impl WakeLock for InhibitWakeLock {
    fn acquire(&mut self) -> Result<()> {
        if self.is_held() {
            return Ok(());
        }
        let child = Command::new(&self.program)
            .arg("--what=idle:sleep")
            .arg("--who=guandan")
            .arg("--why=Scoreboard in use")
            .arg("sleep")
            .arg("infinity")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program))?;
        info!(pid = ?child.id(), "wake lock acquired");
        self.child = Some(child);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        child
            .start_kill()
            .context("failed to stop inhibitor process")?;
        debug!("wake lock released");
        Ok(())
    }

    fn is_held(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!(%status, "inhibitor exited; wake lock lost");
                self.child = None;
                false
            }
            Err(err) => {
                warn!(error = %err, "failed to poll inhibitor; assuming wake lock lost");
                self.child = None;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cues_ring_distinctly() {
        assert_eq!(TerminalBell::rings(Cue::LevelUp), 1);
        assert_eq!(TerminalBell::rings(Cue::LevelDown), 2);
        assert_eq!(TerminalBell::rings(Cue::NextRoundClear), 3);
    }

    #[tokio::test]
    async fn missing_inhibitor_reports_error_and_stays_released() {
        let mut lock = InhibitWakeLock::new("guandan-no-such-inhibitor");
        assert!(lock.acquire().is_err());
        assert!(!lock.is_held());
        assert!(lock.release().is_ok());
    }

    #[tokio::test]
    async fn exited_inhibitor_no_longer_counts_as_held() {
        let mut lock = InhibitWakeLock::new("true");
        lock.acquire().unwrap();

        let mut held = true;
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            held = lock.is_held();
            if !held {
                break;
            }
        }
        assert!(!held);

        lock.acquire().unwrap();
        assert!(lock.child.is_some());
        lock.release().unwrap();
    }
}
