#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Guandan scoreboard.
//!
//! This crate hosts the board model and its normalizer, the action
//! reducer and controller, configuration handling, persistence, and
//! the offline app-shell cache used by the terminal UI and any future
//! frontends.

pub mod collab;
pub mod config;
pub mod controller;
pub mod gesture;
pub mod models;
pub mod offline;
pub mod reducer;
pub mod save;

pub use collab::{CuePlayer, MemoryStore, NoWakeLock, SilentCues, StateStore, WakeLock};
pub use config::AppConfig;
pub use controller::{Dispatched, Scoreboard};
pub use models::{normalize, Language, LevelLabel, ScoreboardState, Team, TeamId};
pub use reducer::{reduce, Action, Cue, Hint, Step, Transition};
pub use save::StateFile;
