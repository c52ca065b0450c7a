//! Note durations to ABC length tokens and back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::UnitLength;
use crate::parser::parse_length;

/// Length suffix after a pitch; empty means "the default length".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationToken(String);

impl DurationToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DurationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DurationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Durations in beats with a dedicated token. Matched exactly.
const TABLE: [(f64, &str); 7] = [
    (0.25, "/4"),
    (0.5, "/2"),
    (0.75, "3/4"),
    (1.0, "1"),
    (1.5, "3/2"),
    (2.0, "2"),
    (3.0, "3"),
];

/// Token for a duration in beats. Never fails.
///
/// Table entries match exactly; four beats or more become whole-note
/// counts (`floor(d / 4)`); anything else is the empty token.
#[allow(clippy::float_cmp)]
pub fn encode(duration: f64) -> DurationToken {
    if let Some((_, token)) = TABLE.iter().find(|(beats, _)| *beats == duration) {
        return DurationToken(token.to_string());
    }

    if duration.is_finite() && duration >= 4.0 {
        return DurationToken(((duration / 4.0).floor() as u64).to_string());
    }

    DurationToken::default()
}

/// Beats for an ABC length multiplier under `unit`.
///
/// `None` when the token is not a length multiplier.
pub fn decode(token: &str, unit: UnitLength) -> Option<f64> {
    let mut input = token.trim();
    let length = parse_length(&mut input).ok()?;
    if !input.is_empty() || length.denominator == 0 {
        return None;
    }
    Some(length.beats(unit))
}

/// Smallest step [`encode_exact`] can express.
pub const SIXTEENTHS_PER_BEAT: u64 = 16;

/// Longest time, in steps, written as an exact length.
pub const MAX_EXACT_STEPS: u64 = 1 << 40;

/// `beats` as a whole number of sixteenth steps.
///
/// `None` for negative, non-finite, or longer than [`MAX_EXACT_STEPS`].
pub fn exact_steps(beats: f64) -> Option<u64> {
    if !beats.is_finite() || beats < 0.0 {
        return None;
    }
    let steps = (beats * SIXTEENTHS_PER_BEAT as f64).round();
    if steps > MAX_EXACT_STEPS as f64 {
        return None;
    }
    Some(steps as u64)
}

/// Exact multiplier for `beats` under `unit`, to the nearest sixteenth of
/// a beat. Anything shorter than one step is written as one step.
pub fn encode_exact(beats: f64, unit: UnitLength) -> Option<DurationToken> {
    encode_steps(exact_steps(beats)?, unit)
}

/// Multiplier for a whole number of sixteenth steps, at least one.
pub fn encode_steps(steps: u64, unit: UnitLength) -> Option<DurationToken> {
    // beats = steps / 16 and unit = 4 * num / den, so the multiplier is
    // steps * den / (64 * num)
    let numerator = steps.max(1).checked_mul(unit.denominator.max(1) as u64)?;
    let denominator = 4 * SIXTEENTHS_PER_BEAT * unit.numerator.max(1) as u64;
    let divisor = gcd(numerator, denominator);

    Some(DurationToken(multiplier(numerator / divisor, denominator / divisor)))
}

fn multiplier(numerator: u64, denominator: u64) -> String {
    match (numerator, denominator) {
        (1, 1) => String::new(),
        (n, 1) => n.to_string(),
        (1, d) => format!("/{d}"),
        (n, d) => format!("{n}/{d}"),
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table() {
        let cases = [
            (0.25, "/4"),
            (0.5, "/2"),
            (0.75, "3/4"),
            (1.0, "1"),
            (1.5, "3/2"),
            (2.0, "2"),
            (3.0, "3"),
        ];
        for (beats, token) in cases {
            assert_eq!(encode(beats).as_str(), token, "beats {beats}");
        }
    }

    #[test]
    fn test_whole_notes() {
        assert_eq!(encode(4.0).as_str(), "1");
        assert_eq!(encode(8.0).as_str(), "2");
        assert_eq!(encode(7.9).as_str(), "1");
        assert_eq!(encode(f64::INFINITY).as_str(), "");
    }

    #[test]
    fn test_unmapped_is_empty() {
        assert!(encode(0.33).is_empty());
        assert!(encode(2.5).is_empty());
        assert!(encode(0.0).is_empty());
        assert!(encode(-1.0).is_empty());
        assert!(encode(f64::NAN).is_empty());
    }

    #[test]
    fn test_decode_against_unit() {
        assert_eq!(decode("", UnitLength::QUARTER), Some(1.0));
        assert_eq!(decode("/4", UnitLength::QUARTER), Some(0.25));
        assert_eq!(decode("3/2", UnitLength::QUARTER), Some(1.5));
        assert_eq!(decode("2", UnitLength::default()), Some(1.0));
        assert_eq!(decode("2x", UnitLength::QUARTER), None);
    }

    #[test]
    fn test_decode_inverts_table_under_quarter_unit() {
        for beats in [0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0] {
            let token = encode(beats);
            assert_eq!(decode(token.as_str(), UnitLength::QUARTER), Some(beats));
        }
    }

    #[test]
    fn test_encode_exact() {
        let quarter = UnitLength::QUARTER;
        let exact = |beats: f64, unit: UnitLength| encode_exact(beats, unit).unwrap();
        assert_eq!(exact(1.0, quarter).as_str(), "");
        assert_eq!(exact(2.0, quarter).as_str(), "2");
        assert_eq!(exact(0.5, quarter).as_str(), "/2");
        assert_eq!(exact(2.5, quarter).as_str(), "5/2");
        assert_eq!(exact(0.0625, quarter).as_str(), "/16");
        assert_eq!(exact(0.0, quarter).as_str(), "/16");
        assert_eq!(exact(1.0, UnitLength::default()).as_str(), "2");
    }

    #[test]
    fn test_exact_steps_bounds() {
        assert_eq!(exact_steps(0.53), Some(8));
        assert_eq!(exact_steps(-0.5), None);
        assert_eq!(exact_steps(f64::NAN), None);
        assert_eq!(exact_steps(1e19), None);
        assert_eq!(encode_exact(1e19, UnitLength::QUARTER), None);

        let longest = MAX_EXACT_STEPS as f64 / SIXTEENTHS_PER_BEAT as f64;
        assert_eq!(exact_steps(longest), Some(MAX_EXACT_STEPS));
        assert!(encode_exact(longest, UnitLength { numerator: 1, denominator: 255 }).is_some());
    }
}
