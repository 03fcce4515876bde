//! Shared domain models.

mod normalize;

use serde::{Deserialize, Serialize};

pub use normalize::normalize;

/// Ordered rank levels a team climbs through during a match.
pub const LEVELS: [&str; 16] = [
    "0", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K", "A1", "A2", "A3",
];

/// Highest valid index into [`LEVELS`].
pub const MAX_LEVEL_INDEX: u8 = (LEVELS.len() - 1) as u8;

/// Highest win count tracked per team.
pub const MAX_WINS: u8 = 10;

/// Display language. `Zh` is the primary language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Simplified Chinese.
    #[default]
    Zh,
    /// English.
    En,
}

impl Language {
    /// The other supported language.
    pub fn toggled(self) -> Self {
        match self {
            Language::Zh => Language::En,
            Language::En => Language::Zh,
        }
    }
}

/// One of the two teams on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamId {
    /// First team.
    A,
    /// Second team.
    B,
}

impl TeamId {
    /// The opposing team.
    pub fn other(self) -> Self {
        match self {
            TeamId::A => TeamId::B,
            TeamId::B => TeamId::A,
        }
    }
}

/// Per-team scoring record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// User supplied name; empty means "use the default label".
    pub name: String,
    /// Index into [`LEVELS`].
    pub level_index: u8,
    /// Rounds won, capped at [`MAX_WINS`].
    pub win_count: u8,
}

impl Team {
    /// Returns the team name, or `default` when no name has been set.
    pub fn display_name<'a>(&'a self, default: &'a str) -> &'a str {
        if self.name.is_empty() {
            default
        } else {
            &self.name
        }
    }

    /// Rank label for the current level.
    pub fn level(&self) -> LevelLabel {
        LevelLabel::of(self.level_index)
    }
}

/// The sole persisted entity: everything the scoreboard remembers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardState {
    /// Display language.
    pub language: Language,
    /// Render levels with oversized digits.
    pub large_digits_mode: bool,
    /// Play audible cues after actions.
    pub sound_enabled: bool,
    /// Hold a wake lock while the board is open.
    pub keep_awake_enabled: bool,
    /// First team.
    pub team_a: Team,
    /// Second team.
    pub team_b: Team,
    /// Team currently holding the stage, if any.
    pub stage_holder: Option<TeamId>,
}

impl Default for ScoreboardState {
    fn default() -> Self {
        Self {
            language: Language::Zh,
            large_digits_mode: false,
            sound_enabled: true,
            keep_awake_enabled: true,
            team_a: Team::default(),
            team_b: Team::default(),
            stage_holder: None,
        }
    }
}

impl ScoreboardState {
    /// Borrow a team record.
    pub fn team(&self, id: TeamId) -> &Team {
        match id {
            TeamId::A => &self.team_a,
            TeamId::B => &self.team_b,
        }
    }

    /// Mutably borrow a team record.
    pub fn team_mut(&mut self, id: TeamId) -> &mut Team {
        match id {
            TeamId::A => &mut self.team_a,
            TeamId::B => &mut self.team_b,
        }
    }

    /// The stage can be held once either team has left the starting level.
    pub fn stage_available(&self) -> bool {
        self.team_a.level_index > 0 || self.team_b.level_index > 0
    }

    /// Team shown as holding the stage.
    ///
    /// While the stage is available but unclaimed, team A is shown as the holder. This only
    /// affects rendering; the stored holder stays empty until an action assigns it.
    pub fn effective_stage(&self) -> Option<TeamId> {
        if !self.stage_available() {
            return None;
        }
        Some(self.stage_holder.unwrap_or(TeamId::A))
    }

    /// Clamp ranges and enforce the stage rule on an already typed draft.
    pub fn normalized(mut self) -> Self {
        for id in [TeamId::A, TeamId::B] {
            let team = self.team_mut(id);
            team.level_index = team.level_index.min(MAX_LEVEL_INDEX);
            team.win_count = team.win_count.min(MAX_WINS);
        }
        if !self.stage_available() {
            self.stage_holder = None;
        }
        self
    }
}

/// A rank label split for display: `A2` renders as a large `A` with a small `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelLabel {
    /// Primary glyph(s).
    pub main: &'static str,
    /// Trailing subscript, empty for most levels.
    pub sub: &'static str,
}

impl LevelLabel {
    /// Label for a level index; out-of-range indices are clamped.
    pub fn of(index: u8) -> Self {
        let raw = LEVELS[usize::from(index.min(MAX_LEVEL_INDEX))];
        match raw.strip_prefix('A') {
            Some(sub) if sub.len() == 1 => Self { main: &raw[..1], sub },
            _ => Self { main: raw, sub: "" },
        }
    }
}
