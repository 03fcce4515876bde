//! Collaborator interfaces used by [`crate::Scoreboard`].
//!
//! Every call into a collaborator is best effort: the controller logs and discards failures so
//! that a broken speaker, a missing inhibitor, or a full disk never blocks a transition.

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::Value;

use crate::{models::ScoreboardState, reducer::Cue};

/// Durable storage for the scoreboard document.
pub trait StateStore: Send {
    /// Return the raw stored document, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<Value>>;
    /// Overwrite the stored document.
    fn save(&self, state: &ScoreboardState) -> Result<()>;
}

/// Plays audible cues.
pub trait CuePlayer: Send {
    /// Play `cue`. Must not block for the duration of the sound.
    fn play(&mut self, cue: Cue) -> Result<()>;
}

/// Platform "prevent sleep" resource.
pub trait WakeLock: Send {
    /// Acquire the lock. Acquiring while held is a no-op.
    fn acquire(&mut self) -> Result<()>;
    /// Release the lock. Releasing while not held is a no-op.
    fn release(&mut self) -> Result<()>;
    /// Whether the lock is currently held. Implementations may notice here that the platform
    /// dropped the lock behind their back.
    fn is_held(&mut self) -> bool;
}

/// Cue player that stays quiet.
#[derive(Debug, Default)]
pub struct SilentCues;

impl CuePlayer for SilentCues {
    fn play(&mut self, _cue: Cue) -> Result<()> {
        Ok(())
    }
}

/// Wake lock for platforms without one.
#[derive(Debug, Default)]
pub struct NoWakeLock;

impl WakeLock for NoWakeLock {
    fn acquire(&mut self) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_held(&mut self) -> bool {
        false
    }
}

/// In-memory store, handy for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<Value>>,
}

impl MemoryStore {
    /// Create a store pre-seeded with a raw document.
    pub fn with_document(document: Value) -> Self {
        Self {
            document: Mutex::new(Some(document)),
        }
    }

    /// Copy of the stored document.
    pub fn document(&self) -> Option<Value> {
        self.document.lock().clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<Value>> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, state: &ScoreboardState) -> Result<()> {
        *self.document.lock() = Some(serde_json::to_value(state)?);
        Ok(())
    }
}
