//! Tap-versus-hold detection for controls with two meanings.

use std::time::{Duration, Instant};

/// Hold threshold for the next-round control.
pub const NEXT_ROUND_HOLD: Duration = Duration::from_millis(650);

/// Hold threshold for a team name (hold restores the default label).
pub const RENAME_HOLD: Duration = Duration::from_millis(500);

/// Which action a finished gesture selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Press {
    /// Released before the threshold.
    Short,
    /// Held until the threshold elapsed.
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    Pending { started: Instant },
}

/// Two-state press machine with a single cancellable timer.
///
/// The caller feeds it begin/end events and polls it from its tick loop; the long action fires
/// at most once per press and suppresses the short action on release.
#[derive(Debug, Clone)]
pub struct LongPress {
    threshold: Duration,
    state: GestureState,
}

impl LongPress {
    /// Create an idle machine with the given hold threshold.
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: GestureState::Idle,
        }
    }

    /// Configured hold threshold.
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Whether a press is in progress.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, GestureState::Pending { .. })
    }

    /// When the pending timer fires, if a press is in progress.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            GestureState::Idle => None,
            GestureState::Pending { started } => Some(started + self.threshold),
        }
    }

    /// Pointer or key went down. Restarts the timer if a press was already pending.
    pub fn begin(&mut self, now: Instant) {
        self.state = GestureState::Pending { started: now };
    }

    /// Fire the long action once the threshold has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Press> {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.state = GestureState::Idle;
                Some(Press::Long)
            }
            _ => None,
        }
    }

    /// Pointer or key went up.
    pub fn end(&mut self, now: Instant) -> Option<Press> {
        let deadline = self.deadline()?;
        self.state = GestureState::Idle;
        if now >= deadline {
            Some(Press::Long)
        } else {
            Some(Press::Short)
        }
    }

    /// Abandon the press without firing anything.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}
