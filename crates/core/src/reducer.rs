//! Pure state transitions for every user action on the board.

use serde::{Deserialize, Serialize};

use crate::models::{Language, ScoreboardState, TeamId, MAX_LEVEL_INDEX, MAX_WINS};

/// Single-step adjustment applied by the level and win controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// +1
    Up,
    /// -1
    Down,
}

impl Step {
    fn apply(self, value: u8, max: u8) -> u8 {
        match self {
            Step::Up => value.saturating_add(1).min(max),
            Step::Down => value.saturating_sub(1),
        }
    }
}

/// User actions understood by the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Move a team one rank up or down.
    ChangeLevel {
        /// Acting team.
        team: TeamId,
        /// Direction.
        step: Step,
    },
    /// Adjust a team's win count.
    ChangeWins {
        /// Acting team.
        team: TeamId,
        /// Direction.
        step: Step,
    },
    /// Pass the stage to the other team.
    ToggleStage,
    /// Long press on the next-round control: clear both levels.
    ResetLevels,
    /// Short press on the next-round control: only a hint.
    NextRoundTap,
    /// Rename a team; the name is trimmed.
    RenameTeam {
        /// Team to rename.
        team: TeamId,
        /// Raw user input.
        name: String,
    },
    /// Restore the default label for a team.
    ResetTeamName(TeamId),
    /// Switch between the two display languages.
    ToggleLanguage,
    /// Select a display language.
    SetLanguage(Language),
    /// Flip audible cues.
    ToggleSound,
    /// Flip the keep-awake preference.
    ToggleKeepAwake,
    /// Flip oversized level digits.
    ToggleLargeDigits,
}

/// Audible notification emitted after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cue {
    /// A team moved up a rank.
    LevelUp,
    /// A team moved down a rank.
    LevelDown,
    /// A win count changed.
    WinChange,
    /// The stage changed hands.
    StageToggle,
    /// Next round was tapped instead of held.
    NextRoundHint,
    /// Levels were cleared for the next round.
    NextRoundClear,
}

impl Cue {
    /// Stable identifier of the cue.
    pub fn name(self) -> &'static str {
        match self {
            Cue::LevelUp => "levelUp",
            Cue::LevelDown => "levelDown",
            Cue::WinChange => "winChange",
            Cue::StageToggle => "stageToggle",
            Cue::NextRoundHint => "nextRoundHint",
            Cue::NextRoundClear => "nextRoundClear",
        }
    }
}

/// Transient, informational message for the user. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// The stage cannot be toggled before either team reaches level 2.
    StageUnavailable,
    /// The next-round control must be held to clear levels.
    HoldForNextRound,
}

/// Result of reducing one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State after the action (identical to the prior state when nothing changed).
    pub state: ScoreboardState,
    /// Whether `state` differs from the prior state.
    pub changed: bool,
    /// Cue to play, if any.
    pub cue: Option<Cue>,
    /// Hint to show, if any.
    pub hint: Option<Hint>,
}

impl Transition {
    fn unchanged(prior: &ScoreboardState) -> Self {
        Self {
            state: prior.clone(),
            changed: false,
            cue: None,
            hint: None,
        }
    }

    fn hint(prior: &ScoreboardState, hint: Hint, cue: Option<Cue>) -> Self {
        Self {
            hint: Some(hint),
            cue,
            ..Self::unchanged(prior)
        }
    }

    fn commit(prior: &ScoreboardState, draft: ScoreboardState, cue: Option<Cue>) -> Self {
        let state = draft.normalized();
        let changed = &state != prior;
        Self {
            state,
            changed,
            cue,
            hint: None,
        }
    }
}

/// Apply `action` to a valid prior state.
pub fn reduce(prior: &ScoreboardState, action: Action) -> Transition {
    match action {
        Action::ChangeLevel { team, step } => change_level(prior, team, step),
        Action::ChangeWins { team, step } => change_wins(prior, team, step),
        Action::ToggleStage => toggle_stage(prior),
        Action::ResetLevels => {
            let mut draft = prior.clone();
            draft.team_a.level_index = 0;
            draft.team_b.level_index = 0;
            draft.stage_holder = None;
            Transition::commit(prior, draft, Some(Cue::NextRoundClear))
        }
        Action::NextRoundTap => {
            Transition::hint(prior, Hint::HoldForNextRound, Some(Cue::NextRoundHint))
        }
        Action::RenameTeam { team, name } => {
            let mut draft = prior.clone();
            draft.team_mut(team).name = name.trim().to_string();
            Transition::commit(prior, draft, None)
        }
        Action::ResetTeamName(team) => {
            let mut draft = prior.clone();
            draft.team_mut(team).name.clear();
            Transition::commit(prior, draft, None)
        }
        Action::ToggleLanguage => {
            let mut draft = prior.clone();
            draft.language = draft.language.toggled();
            Transition::commit(prior, draft, None)
        }
        Action::SetLanguage(language) => {
            let mut draft = prior.clone();
            draft.language = language;
            Transition::commit(prior, draft, None)
        }
        Action::ToggleSound => {
            let mut draft = prior.clone();
            draft.sound_enabled = !draft.sound_enabled;
            Transition::commit(prior, draft, None)
        }
        Action::ToggleKeepAwake => {
            let mut draft = prior.clone();
            draft.keep_awake_enabled = !draft.keep_awake_enabled;
            Transition::commit(prior, draft, None)
        }
        Action::ToggleLargeDigits => {
            let mut draft = prior.clone();
            draft.large_digits_mode = !draft.large_digits_mode;
            Transition::commit(prior, draft, None)
        }
    }
}

fn change_level(prior: &ScoreboardState, team: TeamId, step: Step) -> Transition {
    let current = prior.team(team).level_index;
    let next = step.apply(current, MAX_LEVEL_INDEX);
    if next == current {
        return Transition::unchanged(prior);
    }

    let mut draft = prior.clone();
    draft.team_mut(team).level_index = next;
    draft.stage_holder = if !draft.stage_available() {
        None
    } else {
        match step {
            Step::Up => Some(team),
            Step::Down => prior.stage_holder,
        }
    };

    let cue = match step {
        Step::Up => Cue::LevelUp,
        Step::Down => Cue::LevelDown,
    };
    Transition::commit(prior, draft, Some(cue))
}

fn change_wins(prior: &ScoreboardState, team: TeamId, step: Step) -> Transition {
    let current = prior.team(team).win_count;
    let next = step.apply(current, MAX_WINS);
    if next == current {
        return Transition::unchanged(prior);
    }

    let mut draft = prior.clone();
    draft.team_mut(team).win_count = next;
    Transition::commit(prior, draft, Some(Cue::WinChange))
}

fn toggle_stage(prior: &ScoreboardState) -> Transition {
    if !prior.stage_available() {
        return Transition::hint(prior, Hint::StageUnavailable, None);
    }

    // A missing holder flips as if team A held the stage.
    let holder = prior.stage_holder.unwrap_or(TeamId::A);
    let mut draft = prior.clone();
    draft.stage_holder = Some(holder.other());
    Transition::commit(prior, draft, Some(Cue::StageToggle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(team: TeamId, step: Step) -> Action {
        Action::ChangeLevel { team, step }
    }

    fn wins(team: TeamId, step: Step) -> Action {
        Action::ChangeWins { team, step }
    }

    fn with_levels(a: u8, b: u8, holder: Option<TeamId>) -> ScoreboardState {
        let mut state = ScoreboardState::default();
        state.team_a.level_index = a;
        state.team_b.level_index = b;
        state.stage_holder = holder;
        state
    }

    #[test]
    fn first_level_up_claims_the_stage() {
        let result = reduce(&ScoreboardState::default(), level(TeamId::A, Step::Up));
        assert!(result.changed);
        assert_eq!(result.state.team_a.level_index, 1);
        assert_eq!(result.state.stage_holder, Some(TeamId::A));
        assert_eq!(result.cue, Some(Cue::LevelUp));
    }

    #[test]
    fn level_up_moves_the_stage_to_the_acting_team() {
        let prior = with_levels(3, 2, Some(TeamId::A));
        let result = reduce(&prior, level(TeamId::B, Step::Up));
        assert_eq!(result.state.team_b.level_index, 3);
        assert_eq!(result.state.stage_holder, Some(TeamId::B));
    }

    #[test]
    fn level_up_at_the_top_is_a_no_op() {
        let prior = with_levels(MAX_LEVEL_INDEX, 0, Some(TeamId::A));
        let result = reduce(&prior, level(TeamId::A, Step::Up));
        assert!(!result.changed);
        assert_eq!(result.state, prior);
        assert_eq!(result.cue, None);
    }

    #[test]
    fn level_down_at_zero_is_a_no_op() {
        let prior = with_levels(0, 4, Some(TeamId::B));
        let result = reduce(&prior, level(TeamId::A, Step::Down));
        assert!(!result.changed);
        assert_eq!(result.state, prior);
        assert_eq!(result.cue, None);
    }

    #[test]
    fn dropping_the_last_level_clears_the_stage() {
        let prior = with_levels(1, 0, Some(TeamId::A));
        let result = reduce(&prior, level(TeamId::A, Step::Down));
        assert_eq!(result.state.team_a.level_index, 0);
        assert_eq!(result.state.stage_holder, None);
        assert_eq!(result.cue, Some(Cue::LevelDown));
    }

    #[test]
    fn level_down_keeps_the_current_holder() {
        let prior = with_levels(2, 5, Some(TeamId::A));
        let result = reduce(&prior, level(TeamId::A, Step::Down));
        assert_eq!(result.state.team_a.level_index, 1);
        assert_eq!(result.state.stage_holder, Some(TeamId::A));

        let prior = with_levels(2, 5, None);
        let result = reduce(&prior, level(TeamId::B, Step::Down));
        assert_eq!(result.state.stage_holder, None);
    }

    #[test]
    fn toggle_stage_alternates_between_teams() {
        let prior = with_levels(2, 0, Some(TeamId::A));
        let first = reduce(&prior, Action::ToggleStage);
        assert_eq!(first.state.stage_holder, Some(TeamId::B));
        assert_eq!(first.cue, Some(Cue::StageToggle));

        let second = reduce(&first.state, Action::ToggleStage);
        assert_eq!(second.state.stage_holder, Some(TeamId::A));
    }

    #[test]
    fn toggle_stage_without_holder_lands_on_team_b() {
        let prior = with_levels(0, 3, None);
        let result = reduce(&prior, Action::ToggleStage);
        assert_eq!(result.state.stage_holder, Some(TeamId::B));
    }

    #[test]
    fn toggle_stage_when_unavailable_only_hints() {
        let prior = ScoreboardState::default();
        let result = reduce(&prior, Action::ToggleStage);
        assert!(!result.changed);
        assert_eq!(result.state, prior);
        assert_eq!(
            serde_json::to_vec(&result.state).unwrap(),
            serde_json::to_vec(&prior).unwrap()
        );
        assert_eq!(result.hint, Some(Hint::StageUnavailable));
        assert_eq!(result.cue, None);
    }

    #[test]
    fn reset_levels_keeps_wins() {
        let mut prior = with_levels(9, 12, Some(TeamId::B));
        prior.team_a.win_count = 3;
        prior.team_b.win_count = 7;
        let result = reduce(&prior, Action::ResetLevels);
        assert_eq!(result.state.team_a.level_index, 0);
        assert_eq!(result.state.team_b.level_index, 0);
        assert_eq!(result.state.stage_holder, None);
        assert_eq!(result.state.team_a.win_count, 3);
        assert_eq!(result.state.team_b.win_count, 7);
        assert_eq!(result.cue, Some(Cue::NextRoundClear));
    }

    #[test]
    fn next_round_tap_hints_without_changing_state() {
        let prior = with_levels(4, 4, Some(TeamId::A));
        let result = reduce(&prior, Action::NextRoundTap);
        assert!(!result.changed);
        assert_eq!(result.state, prior);
        assert_eq!(result.hint, Some(Hint::HoldForNextRound));
        assert_eq!(result.cue, Some(Cue::NextRoundHint));
    }

    #[test]
    fn wins_are_bounded() {
        let mut prior = ScoreboardState::default();
        prior.team_b.win_count = MAX_WINS;
        let result = reduce(&prior, wins(TeamId::B, Step::Up));
        assert!(!result.changed);
        assert_eq!(result.cue, None);

        let result = reduce(&prior, wins(TeamId::A, Step::Down));
        assert!(!result.changed);
        assert_eq!(result.state, prior);

        let result = reduce(&prior, wins(TeamId::A, Step::Up));
        assert_eq!(result.state.team_a.win_count, 1);
        assert_eq!(result.cue, Some(Cue::WinChange));
    }

    #[test]
    fn rename_trims_and_reset_clears() {
        let prior = ScoreboardState::default();
        let renamed = reduce(
            &prior,
            Action::RenameTeam {
                team: TeamId::B,
                name: "  East Wind ".to_string(),
            },
        );
        assert_eq!(renamed.state.team_b.name, "East Wind");
        assert_eq!(renamed.cue, None);

        let blank = reduce(
            &renamed.state,
            Action::RenameTeam {
                team: TeamId::B,
                name: "   ".to_string(),
            },
        );
        assert_eq!(blank.state.team_b.name, "");

        let reset = reduce(&renamed.state, Action::ResetTeamName(TeamId::B));
        assert_eq!(reset.state.team_b.name, "");
        assert!(reset.changed);
    }

    #[test]
    fn preferences_flip_without_side_effects() {
        let prior = with_levels(3, 0, Some(TeamId::A));
        let result = reduce(&prior, Action::ToggleSound);
        assert!(!result.state.sound_enabled);
        assert_eq!(result.state.stage_holder, Some(TeamId::A));
        assert_eq!(result.cue, None);

        let result = reduce(&prior, Action::ToggleLanguage);
        assert_eq!(result.state.language, Language::En);
        let result = reduce(&result.state, Action::SetLanguage(Language::En));
        assert!(!result.changed);

        let result = reduce(&prior, Action::ToggleKeepAwake);
        assert!(!result.state.keep_awake_enabled);
        let result = reduce(&prior, Action::ToggleLargeDigits);
        assert!(result.state.large_digits_mode);
    }

    #[test]
    fn cue_names_are_stable() {
        assert_eq!(Cue::LevelUp.name(), "levelUp");
        assert_eq!(Cue::NextRoundClear.name(), "nextRoundClear");
        assert_eq!(serde_json::to_value(Cue::StageToggle).unwrap(), "stageToggle");
    }
}
