//! The scoreboard controller: sole owner of the in-memory state.

use tracing::{debug, info, warn};

use crate::{
    collab::{CuePlayer, StateStore, WakeLock},
    models::{normalize, ScoreboardState},
    reducer::{reduce, Action, Cue, Hint},
};

/// What the UI needs to know after dispatching an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatched {
    /// Whether the state changed (and was persisted).
    pub changed: bool,
    /// Transient hint to show, if any.
    pub hint: Option<Hint>,
}

/// Owns the board state and its collaborators. Actions are applied strictly in dispatch order;
/// each one reads the state committed by the previous one.
pub struct Scoreboard {
    state: ScoreboardState,
    store: Box<dyn StateStore>,
    cues: Box<dyn CuePlayer>,
    wake: Box<dyn WakeLock>,
}

impl Scoreboard {
    /// Load the persisted board (falling back to defaults) and apply the keep-awake preference.
    pub fn open(
        store: Box<dyn StateStore>,
        cues: Box<dyn CuePlayer>,
        wake: Box<dyn WakeLock>,
    ) -> Self {
        let state = match store.load() {
            Ok(Some(raw)) => normalize(&raw),
            Ok(None) => {
                info!("no saved scoreboard; starting fresh");
                ScoreboardState::default()
            }
            Err(err) => {
                warn!(error = %err, "saved scoreboard unreadable; starting fresh");
                ScoreboardState::default()
            }
        };

        let mut board = Self {
            state,
            store,
            cues,
            wake,
        };
        board.sync_wake_lock();
        board
    }

    /// Current committed state.
    pub fn state(&self) -> &ScoreboardState {
        &self.state
    }

    /// Apply one action, persist the result, and notify collaborators.
    pub fn dispatch(&mut self, action: Action) -> Dispatched {
        debug!(?action, "dispatch");
        let transition = reduce(&self.state, action);
        let keep_awake_before = self.state.keep_awake_enabled;

        if transition.changed {
            self.state = transition.state;
            self.persist();
        }
        if let Some(cue) = transition.cue {
            self.play(cue);
        }
        if self.state.keep_awake_enabled != keep_awake_before {
            self.sync_wake_lock();
        }

        Dispatched {
            changed: transition.changed,
            hint: transition.hint,
        }
    }

    /// The app came back to the foreground (or left it).
    pub fn on_visibility(&mut self, visible: bool) {
        if visible && self.state.keep_awake_enabled && !self.wake.is_held() {
            self.sync_wake_lock();
        }
    }

    /// Release platform resources before exit.
    pub fn shutdown(&mut self) {
        if let Err(err) = self.wake.release() {
            debug!(error = %err, "wake lock release failed");
        }
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.state) {
            warn!(error = %err, "failed to persist scoreboard");
        }
    }

    fn play(&mut self, cue: Cue) {
        if !self.state.sound_enabled {
            return;
        }
        if let Err(err) = self.cues.play(cue) {
            debug!(cue = cue.name(), error = %err, "cue playback failed");
        }
    }

    fn sync_wake_lock(&mut self) {
        let result = if self.state.keep_awake_enabled {
            self.wake.acquire()
        } else {
            self.wake.release()
        };
        if let Err(err) = result {
            debug!(
                keep_awake = self.state.keep_awake_enabled,
                error = %err,
                "wake lock update failed"
            );
        }
    }
}

impl Drop for Scoreboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    use super::*;
    use crate::{
        collab::{MemoryStore, NoWakeLock, SilentCues},
        models::TeamId,
        reducer::Step,
    };

    #[derive(Clone, Default)]
    struct Recorder {
        cues: Arc<Mutex<Vec<Cue>>>,
        fail: bool,
    }

    impl CuePlayer for Recorder {
        fn play(&mut self, cue: Cue) -> Result<()> {
            self.cues.lock().push(cue);
            if self.fail {
                return Err(anyhow!("no audio device"));
            }
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeWake {
        held: Arc<Mutex<bool>>,
        acquisitions: Arc<Mutex<usize>>,
        fail: bool,
    }

    impl WakeLock for FakeWake {
        fn acquire(&mut self) -> Result<()> {
            *self.acquisitions.lock() += 1;
            if self.fail {
                return Err(anyhow!("inhibitor unavailable"));
            }
            *self.held.lock() = true;
            Ok(())
        }

        fn release(&mut self) -> Result<()> {
            *self.held.lock() = false;
            Ok(())
        }

        fn is_held(&mut self) -> bool {
            *self.held.lock()
        }
    }

    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn load(&self) -> Result<Option<Value>> {
            Err(anyhow!("storage unavailable"))
        }

        fn save(&self, _state: &ScoreboardState) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }
    }

    struct SharedStore(Arc<MemoryStore>);

    impl StateStore for SharedStore {
        fn load(&self) -> Result<Option<Value>> {
            self.0.load()
        }

        fn save(&self, state: &ScoreboardState) -> Result<()> {
            self.0.save(state)
        }
    }

    fn level_up(team: TeamId) -> Action {
        Action::ChangeLevel {
            team,
            step: Step::Up,
        }
    }

    #[test]
    fn restores_and_normalizes_saved_state() {
        let store = MemoryStore::with_document(json!({
            "teamA": {"levelIndex": 40, "winCount": 2},
            "stageHolder": "A",
        }));
        let board = Scoreboard::open(Box::new(store), Box::new(SilentCues), Box::new(NoWakeLock));
        assert_eq!(board.state().team_a.level_index, 15);
        assert_eq!(board.state().team_a.win_count, 2);
        assert_eq!(board.state().stage_holder, Some(TeamId::A));
    }

    #[test]
    fn every_change_is_persisted() {
        let store = Arc::new(MemoryStore::default());
        let mut board = Scoreboard::open(
            Box::new(SharedStore(store.clone())),
            Box::new(SilentCues),
            Box::new(NoWakeLock),
        );
        assert!(store.document().is_none());

        board.dispatch(level_up(TeamId::B));
        let saved = store.document().expect("document saved");
        assert_eq!(saved["teamB"]["levelIndex"], 1);
        assert_eq!(saved["stageHolder"], "B");
    }

    #[test]
    fn broken_storage_never_blocks_transitions() {
        let mut board = Scoreboard::open(
            Box::new(BrokenStore),
            Box::new(SilentCues),
            Box::new(NoWakeLock),
        );
        assert_eq!(board.state(), &ScoreboardState::default());

        let outcome = board.dispatch(level_up(TeamId::A));
        assert!(outcome.changed);
        assert_eq!(board.state().team_a.level_index, 1);
    }

    #[test]
    fn cues_follow_transitions_and_respect_the_sound_setting() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let cues = recorder.cues.clone();
        let mut board = Scoreboard::open(
            Box::new(MemoryStore::default()),
            Box::new(recorder),
            Box::new(NoWakeLock),
        );

        board.dispatch(level_up(TeamId::A));
        board.dispatch(Action::ChangeLevel {
            team: TeamId::B,
            step: Step::Down,
        });
        board.dispatch(Action::NextRoundTap);
        assert_eq!(*cues.lock(), vec![Cue::LevelUp, Cue::NextRoundHint]);

        board.dispatch(Action::ToggleSound);
        board.dispatch(level_up(TeamId::A));
        assert_eq!(cues.lock().len(), 2);
        assert_eq!(board.state().team_a.level_index, 2);
    }

    #[test]
    fn unavailable_stage_toggle_reports_a_hint() {
        let mut board = Scoreboard::open(
            Box::new(MemoryStore::default()),
            Box::new(SilentCues),
            Box::new(NoWakeLock),
        );
        let before = board.state().clone();
        let outcome = board.dispatch(Action::ToggleStage);
        assert_eq!(
            outcome,
            Dispatched {
                changed: false,
                hint: Some(Hint::StageUnavailable),
            }
        );
        assert_eq!(board.state(), &before);
    }

    #[test]
    fn wake_lock_tracks_preference_and_visibility() {
        let wake = FakeWake::default();
        let held = wake.held.clone();
        let acquisitions = wake.acquisitions.clone();
        let mut board = Scoreboard::open(
            Box::new(MemoryStore::default()),
            Box::new(SilentCues),
            Box::new(wake),
        );
        assert!(*held.lock());
        assert_eq!(*acquisitions.lock(), 1);

        // The platform dropped the lock while hidden.
        *held.lock() = false;
        board.on_visibility(false);
        assert_eq!(*acquisitions.lock(), 1);
        board.on_visibility(true);
        assert!(*held.lock());
        assert_eq!(*acquisitions.lock(), 2);

        board.dispatch(Action::ToggleKeepAwake);
        assert!(!*held.lock());
        board.on_visibility(true);
        assert!(!*held.lock());

        board.dispatch(Action::ToggleKeepAwake);
        assert!(*held.lock());

        board.shutdown();
        assert!(!*held.lock());
    }

    #[test]
    fn wake_lock_failures_are_ignored() {
        let wake = FakeWake {
            fail: true,
            ..FakeWake::default()
        };
        let mut board = Scoreboard::open(
            Box::new(MemoryStore::default()),
            Box::new(SilentCues),
            Box::new(wake),
        );
        let outcome = board.dispatch(Action::ToggleKeepAwake);
        assert!(outcome.changed);
        assert!(!board.state().keep_awake_enabled);
    }
}
