//! K: field parsing.

use crate::ast::{Accidental, Key, Mode, NoteName};
use crate::feedback::FeedbackCollector;

use super::note::{parse_accidental, parse_pitch};

/// Parse a K: value such as `G`, `Am`, `Emin`, `D dorian`, `F#m`, `Bb`,
/// or `D ^c` (explicit accidentals after the mode).
pub fn parse_key_field(value: &str, collector: &mut FeedbackCollector) -> Key {
    let trimmed = value.trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Key::default();
    }

    let mut chars = trimmed.chars();
    let root = match chars.next().and_then(NoteName::from_char) {
        Some(root) => root,
        None => {
            collector.warning(format!("Invalid key '{}', assuming C", trimmed));
            return Key::default();
        }
    };
    let mut rest = chars.as_str();

    let accidental = if let Some(after) = rest.strip_prefix('#') {
        rest = after;
        Some(Accidental::Sharp)
    } else if let Some(after) = rest.strip_prefix('b') {
        // no mode name starts with 'b'
        rest = after;
        Some(Accidental::Flat)
    } else {
        None
    };

    let mut words = rest.split_whitespace().peekable();

    // the mode may be glued to the root ("Emin") or separate ("E minor")
    let mode = match words.peek().copied() {
        Some(word) if !is_accidental_word(word) && !word.contains('=') => {
            words.next();
            Mode::parse(word).unwrap_or_else(|| {
                collector.warning(format!("Unknown mode '{}', assuming major", word));
                Mode::Major
            })
        }
        _ => Mode::Major,
    };

    let mut explicit_accidentals = Vec::new();
    for word in words {
        if word.contains('=') && !word.starts_with('=') {
            // clef=, transpose= and friends do not change pitch here
            continue;
        }
        match parse_explicit_accidental(word) {
            Some(pair) => explicit_accidentals.push(pair),
            None => collector.warning(format!("Ignoring key modifier '{}'", word)),
        }
    }

    Key {
        root,
        accidental,
        mode,
        explicit_accidentals,
    }
}

fn is_accidental_word(word: &str) -> bool {
    word.starts_with(['^', '_', '='])
}

fn parse_explicit_accidental(word: &str) -> Option<(Accidental, NoteName)> {
    let mut input = word;
    let accidental = parse_accidental(&mut input).ok()?;
    let (name, _) = parse_pitch(&mut input).ok()?;
    // octave marks on key accidentals apply to every octave anyway
    let input = input.trim_start_matches(['\'', ',']);
    input.is_empty().then_some((accidental, name))
}
