use serde_json::{Map, Value};

use super::{Language, ScoreboardState, Team, TeamId, MAX_LEVEL_INDEX, MAX_WINS};

/// Repair arbitrary JSON into a valid [`ScoreboardState`].
///
/// Never fails: missing fields take their defaults, numbers are coerced and clamped, and the
/// stage holder only survives while the stage is available. Keys written by older builds
/// (`lang`, `seniorMode`, `soundOn`, `keepAwake`, `stageTeam`, `wins`) are read when the current
/// key is absent. Unknown keys are ignored.
pub fn normalize(candidate: &Value) -> ScoreboardState {
    let Some(object) = candidate.as_object() else {
        return ScoreboardState::default();
    };

    let language = match field(object, "language", "lang").and_then(Value::as_str) {
        Some("en") => Language::En,
        _ => Language::Zh,
    };
    let large_digits_mode = matches!(
        field(object, "largeDigitsMode", "seniorMode"),
        Some(Value::Bool(true))
    );
    let sound_enabled = !matches!(
        field(object, "soundEnabled", "soundOn"),
        Some(Value::Bool(false))
    );
    let keep_awake_enabled = !matches!(
        field(object, "keepAwakeEnabled", "keepAwake"),
        Some(Value::Bool(false))
    );

    let team_a = normalize_team(object.get("teamA"));
    let team_b = normalize_team(object.get("teamB"));

    let stage_holder = match field(object, "stageHolder", "stageTeam").and_then(Value::as_str) {
        Some("A") => Some(TeamId::A),
        Some("B") => Some(TeamId::B),
        _ => None,
    };

    ScoreboardState {
        language,
        large_digits_mode,
        sound_enabled,
        keep_awake_enabled,
        team_a,
        team_b,
        stage_holder,
    }
    .normalized()
}

fn field<'a>(object: &'a Map<String, Value>, key: &str, legacy: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| object.get(legacy))
}

fn normalize_team(value: Option<&Value>) -> Team {
    let Some(object) = value.and_then(Value::as_object) else {
        return Team::default();
    };

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default();

    Team {
        name,
        level_index: coerce_clamped(object.get("levelIndex"), MAX_LEVEL_INDEX),
        win_count: coerce_clamped(field(object, "winCount", "wins"), MAX_WINS),
    }
}

/// Loose numeric coercion: numbers as-is, booleans as 1/0, decimal strings parsed, the rest 0.
fn coerce_clamped(value: Option<&Value>, max: u8) -> u8 {
    let number = match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::Bool(flag)) => f64::from(u8::from(*flag)),
        Some(Value::String(text)) => parse_decimal(text),
        _ => 0.0,
    };
    if number.is_nan() {
        return 0;
    }
    number.clamp(0.0, f64::from(max)).trunc() as u8
}

/// String-to-number rules of a loose numeric cast: decimal, signed `Infinity`, and unsigned
/// `0x`/`0o`/`0b` integers. Anything else is 0.
fn parse_decimal(text: &str) -> f64 {
    let trimmed = text.trim();
    match trimmed {
        "" => return 0.0,
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &trimmed[2..];
        if digits.starts_with(['+', '-']) {
            return 0.0;
        }
        return u128::from_str_radix(digits, radix)
            .map(|value| value as f64)
            .unwrap_or(0.0);
    }
    // Rust accepts "inf"/"nan" spellings that a loose numeric cast would reject.
    if trimmed
        .chars()
        .any(|ch| !(ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+' | 'e' | 'E')))
    {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_valid(state: &ScoreboardState) {
        for team in [&state.team_a, &state.team_b] {
            assert!(team.level_index <= MAX_LEVEL_INDEX);
            assert!(team.win_count <= MAX_WINS);
        }
        if state.team_a.level_index == 0 && state.team_b.level_index == 0 {
            assert_eq!(state.stage_holder, None);
        }
    }

    fn samples() -> Vec<Value> {
        vec![
            Value::Null,
            json!([]),
            json!("garbage"),
            json!(42),
            json!({}),
            json!({"teamA": "oops", "teamB": null}),
            json!({"teamA": {"levelIndex": 99, "winCount": -4}, "stageHolder": "A"}),
            json!({"teamA": {"levelIndex": "7"}, "teamB": {"levelIndex": true, "winCount": "11"}}),
            json!({"teamA": {"levelIndex": 3.9}, "stageHolder": "C"}),
            json!({"teamA": {"levelIndex": 0}, "teamB": {"levelIndex": 0}, "stageHolder": "B"}),
            json!({"language": "fr", "largeDigitsMode": "yes", "soundEnabled": 0}),
            json!({"lang": "en", "seniorMode": true, "keepAwake": false, "stageTeam": "B",
                   "teamB": {"name": "Legacy", "levelIndex": 4, "wins": 2}}),
            json!({"teamA": {"levelIndex": "NaN", "winCount": "Infinity"}}),
            json!({"teamA": {"name": 12, "levelIndex": {"nested": 1}}, "extra": [1, 2, 3]}),
        ]
    }

    #[test]
    fn output_is_always_within_ranges() {
        for sample in samples() {
            assert_valid(&normalize(&sample));
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        for sample in samples() {
            let once = normalize(&sample);
            let again = normalize(&serde_json::to_value(&once).unwrap());
            assert_eq!(once, again, "sample {sample}");
        }
    }

    #[test]
    fn non_objects_yield_defaults() {
        assert_eq!(normalize(&Value::Null), ScoreboardState::default());
        assert_eq!(normalize(&json!("x")), ScoreboardState::default());
        assert_eq!(normalize(&json!([1, 2])), ScoreboardState::default());
    }

    #[test]
    fn numbers_are_coerced_then_clamped() {
        let state = normalize(&json!({
            "teamA": {"levelIndex": 99, "winCount": -4},
            "teamB": {"levelIndex": " 7 ", "winCount": "abc"},
        }));
        assert_eq!(state.team_a.level_index, MAX_LEVEL_INDEX);
        assert_eq!(state.team_a.win_count, 0);
        assert_eq!(state.team_b.level_index, 7);
        assert_eq!(state.team_b.win_count, 0);

        let state = normalize(&json!({"teamA": {"levelIndex": true, "winCount": 3.7}}));
        assert_eq!(state.team_a.level_index, 1);
        assert_eq!(state.team_a.win_count, 3);
    }

    #[test]
    fn infinity_and_prefixed_integers_follow_loose_casts() {
        let state = normalize(&json!({
            "teamA": {"levelIndex": "Infinity", "winCount": "-Infinity"},
            "teamB": {"levelIndex": "0x0a", "winCount": "0b11"},
        }));
        assert_eq!(state.team_a.level_index, MAX_LEVEL_INDEX);
        assert_eq!(state.team_a.win_count, 0);
        assert_eq!(state.team_b.level_index, 10);
        assert_eq!(state.team_b.win_count, 3);

        assert_eq!(parse_decimal("infinity"), 0.0);
        assert_eq!(parse_decimal("-0x10"), 0.0);
        assert_eq!(parse_decimal("0x"), 0.0);
        assert_eq!(parse_decimal("0x+1"), 0.0);
        assert_eq!(parse_decimal(" 0o17 "), 15.0);
    }

    #[test]
    fn stage_holder_requires_availability_and_exact_value() {
        let state = normalize(&json!({"stageHolder": "A"}));
        assert_eq!(state.stage_holder, None);

        let state = normalize(&json!({"teamB": {"levelIndex": 2}, "stageHolder": "B"}));
        assert_eq!(state.stage_holder, Some(TeamId::B));

        let state = normalize(&json!({"teamB": {"levelIndex": 2}, "stageHolder": "TeamB"}));
        assert_eq!(state.stage_holder, None);

        let state = normalize(&json!({"teamB": {"levelIndex": 2}, "stageHolder": 1}));
        assert_eq!(state.stage_holder, None);
    }

    #[test]
    fn preferences_only_flip_on_explicit_booleans() {
        let state = normalize(&json!({}));
        assert_eq!(state.language, Language::Zh);
        assert!(!state.large_digits_mode);
        assert!(state.sound_enabled);
        assert!(state.keep_awake_enabled);

        let state = normalize(&json!({
            "language": "fr",
            "largeDigitsMode": 1,
            "soundEnabled": null,
            "keepAwakeEnabled": "false",
        }));
        assert_eq!(state.language, Language::Zh);
        assert!(!state.large_digits_mode);
        assert!(state.sound_enabled);
        assert!(state.keep_awake_enabled);

        let state = normalize(&json!({
            "language": "en",
            "largeDigitsMode": true,
            "soundEnabled": false,
            "keepAwakeEnabled": false,
        }));
        assert_eq!(state.language, Language::En);
        assert!(state.large_digits_mode);
        assert!(!state.sound_enabled);
        assert!(!state.keep_awake_enabled);
    }

    #[test]
    fn legacy_keys_are_read_when_current_keys_are_absent() {
        let state = normalize(&json!({
            "lang": "en",
            "seniorMode": true,
            "soundOn": false,
            "keepAwake": false,
            "stageTeam": "B",
            "teamA": {"name": "", "levelIndex": 0, "wins": 4},
            "teamB": {"name": "Legacy", "levelIndex": 5, "wins": 2},
        }));
        assert_eq!(state.language, Language::En);
        assert!(state.large_digits_mode);
        assert!(!state.sound_enabled);
        assert!(!state.keep_awake_enabled);
        assert_eq!(state.stage_holder, Some(TeamId::B));
        assert_eq!(state.team_a.win_count, 4);
        assert_eq!(state.team_b.name, "Legacy");

        let state = normalize(&json!({"language": "zh", "lang": "en"}));
        assert_eq!(state.language, Language::Zh);
    }

    #[test]
    fn names_are_kept_verbatim_and_non_strings_dropped() {
        let state = normalize(&json!({
            "teamA": {"name": "  Spaced  "},
            "teamB": {"name": 7},
        }));
        assert_eq!(state.team_a.name, "  Spaced  ");
        assert_eq!(state.team_b.name, "");
    }
}
