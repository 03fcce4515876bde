use std::collections::HashMap;

use once_cell::sync::Lazy;

pub const FONT_HEIGHT: usize = 5;
const FONT_WIDTH: usize = 4;
const FILL_CHAR: char = '█';

type Glyph = [&'static str; FONT_HEIGHT];

static GLYPHS: Lazy<HashMap<char, Glyph>> = Lazy::new(|| {
    HashMap::from([
        ('0', ["1111", "1  1", "1  1", "1  1", "1111"]),
        ('1', ["  1 ", " 11 ", "  1 ", "  1 ", " 111"]),
        ('2', ["1111", "   1", "1111", "1   ", "1111"]),
        ('3', ["1111", "   1", " 111", "   1", "1111"]),
        ('4', ["1  1", "1  1", "1111", "   1", "   1"]),
        ('5', ["1111", "1   ", "1111", "   1", "1111"]),
        ('6', ["1111", "1   ", "1111", "1  1", "1111"]),
        ('7', ["1111", "   1", "  1 ", " 1  ", " 1  "]),
        ('8', ["1111", "1  1", "1111", "1  1", "1111"]),
        ('9', ["1111", "1  1", "1111", "   1", "1111"]),
        ('J', ["1111", "  1 ", "  1 ", "1 1 ", "111 "]),
        ('Q', [" 11 ", "1  1", "1  1", "1 11", " 111"]),
        ('K', ["1  1", "1 1 ", "11  ", "1 1 ", "1  1"]),
        ('A', [" 11 ", "1  1", "1111", "1  1", "1  1"]),
    ])
});

/// Render a rank label as block digits, `FONT_HEIGHT` rows tall. Unknown characters are skipped.
pub fn render(text: &str) -> Vec<String> {
    let glyphs: Vec<&Glyph> = text
        .chars()
        .filter_map(|ch| GLYPHS.get(&ch.to_ascii_uppercase()))
        .collect();
    if glyphs.is_empty() {
        return Vec::new();
    }

    let mut rows = vec![String::new(); FONT_HEIGHT];
    for (index, glyph) in glyphs.iter().enumerate() {
        for (row, pattern) in rows.iter_mut().zip(glyph.iter()) {
            if index > 0 {
                row.push_str("  ");
            }
            for symbol in pattern.chars() {
                let cell = if symbol == '1' { FILL_CHAR } else { ' ' };
                row.push(cell);
                row.push(cell);
            }
        }
    }

    rows.into_iter()
        .map(|row| row.trim_end().to_string())
        .collect()
}

/// Width in cells of `render(text)` before trimming.
pub fn width(text: &str) -> usize {
    let count = text
        .chars()
        .filter(|ch| GLYPHS.contains_key(&ch.to_ascii_uppercase()))
        .count();
    if count == 0 {
        0
    } else {
        count * FONT_WIDTH * 2 + (count - 1) * 2
    }
}

#[cfg(test)]
mod tests {
    use guandan_core::{models::MAX_LEVEL_INDEX, LevelLabel};

    use super::*;

    #[test]
    fn renders_every_rank_label() {
        for index in 0..=MAX_LEVEL_INDEX {
            let main = LevelLabel::of(index).main;
            let rows = render(main);
            assert_eq!(rows.len(), FONT_HEIGHT, "{main}");
            assert!(rows.iter().any(|row| !row.is_empty()), "{main}");
            assert!(rows.iter().all(|row| row.chars().count() <= width(main)));
        }
    }

    #[test]
    fn ten_is_two_glyphs_wide() {
        assert_eq!(width("10"), 18);
        assert_eq!(render("7")[0], "████████");
        assert!(render("?").is_empty());
    }
}
