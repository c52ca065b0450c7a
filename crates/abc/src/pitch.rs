//! MIDI pitch numbers to ABC pitch tokens and back.
//!
//! The canonical spelling keeps the letter uppercase and marks octaves
//! relative to MIDI 60-71, so every token is plain standard ABC and
//! [`decode`] inverts [`encode`] for the whole 0-127 range.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::Note;
use crate::parser::{parse_accidental, parse_octave_marks, parse_pitch};

/// Sharps-only chromatic spelling, indexed by `pitch % 12`.
const CHROMATIC: [&str; 12] = ["C", "^C", "D", "^D", "E", "F", "^F", "G", "^G", "A", "^A", "B"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PitchError {
    #[error("pitch {0} is outside 0-127")]
    OutOfRange(i16),

    #[error("'{0}' is not an ABC pitch")]
    Malformed(String),
}

/// One ABC pitch: optional accidental, letter, octave marks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PitchToken(String);

impl PitchToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PitchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PitchToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn octave_of(pitch: u8) -> i16 {
    pitch as i16 / 12 - 1
}

/// Canonical spelling: 60 is `C`, 48 is `C,`, 72 is `C'`.
///
/// The older reference-octave-5 rule lives on as [`encode_legacy`].
pub fn encode(pitch: u8) -> Result<PitchToken, PitchError> {
    if pitch > 127 {
        return Err(PitchError::OutOfRange(pitch as i16));
    }

    let octave = octave_of(pitch);
    let name = CHROMATIC[(pitch % 12) as usize];
    let marks = if octave < 4 {
        ",".repeat((4 - octave) as usize)
    } else {
        "'".repeat((octave - 4) as usize)
    };

    Ok(PitchToken(format!("{name}{marks}")))
}

/// Older spelling around reference octave 5.
///
/// Below the reference the token is lowercased and gets `5 - octave - 1`
/// commas, above it keeps the letter and gets `octave - 5` apostrophes.
/// Not injective: 60 and 72 both come out as `c`.
pub fn encode_legacy(pitch: u8) -> Result<PitchToken, PitchError> {
    if pitch > 127 {
        return Err(PitchError::OutOfRange(pitch as i16));
    }

    let octave = octave_of(pitch);
    let name = CHROMATIC[(pitch % 12) as usize];
    let token = match octave.cmp(&5) {
        std::cmp::Ordering::Less => {
            format!("{}{}", name.to_lowercase(), ",".repeat((5 - octave - 1) as usize))
        }
        std::cmp::Ordering::Equal => name.to_lowercase(),
        std::cmp::Ordering::Greater => format!("{}{}", name, "'".repeat((octave - 5) as usize)),
    };

    Ok(PitchToken(token))
}

/// Read one pitch token, with no key or bar context.
///
/// The whole input must be a single pitch; lengths and ties are rejected.
pub fn decode(token: &str) -> Result<u8, PitchError> {
    let malformed = || PitchError::Malformed(token.to_string());

    let mut input = token.trim();
    let accidental = parse_accidental(&mut input).ok();
    let (name, base_octave) = parse_pitch(&mut input).map_err(|_| malformed())?;
    let shift = parse_octave_marks(&mut input).map_err(|_| malformed())?;
    if !input.is_empty() {
        return Err(malformed());
    }

    let note = Note {
        accidental,
        octave: base_octave.saturating_add(shift),
        ..Note::new(name, 0)
    };
    note.written_pitch().ok_or_else(|| {
        let offset = accidental.map_or(0, |a| a.to_semitone_offset()) as i16;
        PitchError::OutOfRange(
            (note.octave as i16 + 5) * 12 + name.to_semitone() as i16 + offset,
        )
    })
}
