use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Values per note in the control surface's flat note list:
/// pitch, start, duration, velocity, mute.
pub const FLAT_NOTE_ARITY: usize = 5;

/// A finalized note. Times are in beats unless the producer says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: u8,
    pub velocity: u8,
    pub start: f64,
    pub duration: f64,
}

impl NoteEvent {
    pub fn new(pitch: u8, velocity: u8, start: f64, duration: f64) -> Self {
        Self {
            pitch,
            velocity,
            start,
            duration,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Parse the flat list returned by a clip note query
    /// (`pitch, start, duration, velocity, mute` repeated).
    ///
    /// The mute flag is read but not kept; muted notes are still notes.
    pub fn from_flat(values: &[f64]) -> Result<Vec<NoteEvent>> {
        if values.len() % FLAT_NOTE_ARITY != 0 {
            return Err(Error::FlatArity { len: values.len() });
        }

        values
            .chunks_exact(FLAT_NOTE_ARITY)
            .enumerate()
            .map(|(index, chunk)| {
                Ok(NoteEvent {
                    pitch: seven_bit(index, "pitch", chunk[0])?,
                    start: non_negative(index, "start", chunk[1])?,
                    duration: non_negative(index, "duration", chunk[2])?,
                    velocity: seven_bit(index, "velocity", chunk[3])?,
                })
            })
            .collect()
    }
}

fn seven_bit(index: usize, field: &'static str, value: f64) -> Result<u8> {
    if value.fract() == 0.0 && (0.0..=127.0).contains(&value) {
        Ok(value as u8)
    } else {
        Err(Error::InvalidField {
            index,
            field,
            value,
        })
    }
}

fn non_negative(index: usize, field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidField {
            index,
            field,
            value,
        })
    }
}

/// Reconstructed notes plus the derived clip metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Notes in the order they were closed, not sorted by start.
    pub events: Vec<NoteEvent>,
    /// Time of the last meaningful event, rounded half-to-even.
    pub total_length: u32,
    /// First program change seen, if any.
    pub instrument_program: Option<u8>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Latest note end, which can differ from `total_length`.
    pub fn end(&self) -> f64 {
        self.events.iter().map(NoteEvent::end).fold(0.0, f64::max)
    }

    /// Notes ordered by start, then pitch.
    pub fn sorted_by_start(&self) -> Vec<NoteEvent> {
        let mut notes = self.events.clone();
        notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));
        notes
    }
}

/// Round a clock value to whole beats the way clip lengths are reported.
pub fn round_length(time: f64) -> u32 {
    // `as` saturates: NaN and negatives become 0
    time.round_ties_even() as u32
}
