//! Timelines to ABC text.
//!
//! Two forms. The prompt body ([`encode_timeline`] + [`wrap_as_document`])
//! is the compact one models are used to seeing: table durations, repeat
//! wrapped, whitespace stripped. [`Document::render`] writes standard ABC
//! with exact lengths and rests so it decodes back to the same notes.

use serde::{Deserialize, Serialize};
use timeline::{NoteEvent, Timeline};
use tracing::{debug, warn};

use crate::ast::{Accidental, NoteName, UnitLength};
use crate::feedback::FeedbackCollector;
use crate::length;
use crate::parser::parse_key_field;
use crate::pitch::{self, PitchToken};

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("note {index}: pitch {pitch} is outside 0-127")]
    PitchOutOfRange { index: usize, pitch: u8 },

    #[error("note {index}: invalid {field} {value}")]
    InvalidTime {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("note {index}: {field} {value} is too long to write exactly")]
    TooLong {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error(transparent)]
    Notes(#[from] timeline::Error),
}

/// Which octave spelling the body uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OctaveStyle {
    /// Uppercase letters for MIDI 60-71; decodes back exactly.
    #[default]
    Canonical,
    /// Lowercase reference octave, as older prompts were built.
    Legacy,
}

/// Space separated pitch+length tokens, not yet wrapped in a document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Body(String);

impl Body {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn check_times(index: usize, event: &NoteEvent) -> Result<(), EncodeError> {
    for (field, value) in [("start", event.start), ("duration", event.duration)] {
        if !value.is_finite() || value < 0.0 {
            return Err(EncodeError::InvalidTime {
                index,
                field,
                value,
            });
        }
    }
    Ok(())
}

fn pitch_token(index: usize, pitch: u8, style: OctaveStyle) -> Result<PitchToken, EncodeError> {
    let token = match style {
        OctaveStyle::Canonical => pitch::encode(pitch),
        OctaveStyle::Legacy => pitch::encode_legacy(pitch),
    };
    token.map_err(|_| EncodeError::PitchOutOfRange { index, pitch })
}

pub fn encode_timeline(events: &[NoteEvent]) -> Result<Body, EncodeError> {
    encode_timeline_with(events, OctaveStyle::Canonical)
}

/// One `pitch+length` token per event, in the given order.
///
/// Any bad event fails the whole body; no partial text is returned.
pub fn encode_timeline_with(events: &[NoteEvent], style: OctaveStyle) -> Result<Body, EncodeError> {
    let mut tokens = Vec::with_capacity(events.len());
    for (index, event) in events.iter().enumerate() {
        check_times(index, event)?;
        let pitch = pitch_token(index, event.pitch, style)?;
        tokens.push(format!("{}{}", pitch, length::encode(event.duration)));
    }
    Ok(Body(tokens.join(" ")))
}

/// [`encode_timeline`] collapsed to an empty string on failure.
pub fn encode_timeline_or_empty(events: &[NoteEvent]) -> String {
    match encode_timeline(events) {
        Ok(body) => body.into_string(),
        Err(e) => {
            warn!(error = %e, notes = events.len(), "encoding failed, using empty body");
            String::new()
        }
    }
}

pub fn encode_flat_notes(values: &[f64]) -> Result<Body, EncodeError> {
    encode_flat_notes_with(values, OctaveStyle::Canonical)
}

/// Encode the flat `pitch, start, duration, velocity, mute` list a clip
/// note query returns.
pub fn encode_flat_notes_with(values: &[f64], style: OctaveStyle) -> Result<Body, EncodeError> {
    let events = NoteEvent::from_flat(values)?;
    encode_timeline_with(&events, style)
}

/// Header fields for a generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub index: u32,
    pub title: String,
    pub meter: String,
    pub default_length: String,
    pub key: String,
}

impl Default for DocumentHeader {
    fn default() -> Self {
        Self {
            index: 1,
            title: "Melody Example".to_string(),
            meter: "4/4".to_string(),
            default_length: "1/8".to_string(),
            key: "Emin".to_string(),
        }
    }
}

impl DocumentHeader {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    fn lines(&self, default_length: &str) -> String {
        format!(
            "X:{}\nT:{}\nM:{}\nL:{}\nK:{}\n",
            self.index, self.title, self.meter, default_length, self.key
        )
    }
}

/// Prompt form of a body: header, repeat bars, no spaces.
///
/// The body gets the `1`→`8` then `/2`→`2` substitutions first. Those are
/// plain text replacements and apply once; do not feed the result back in.
pub fn wrap_as_document(body: &str, header: &DocumentHeader) -> String {
    let body = body.replace('1', "8").replace("/2", "2");
    let text = format!("{}|: {} :|", header.lines(&header.default_length), body);
    text.chars().filter(|c| *c != ' ' && *c != '\t').collect()
}

/// Standard ABC for a timeline, exact enough to decode back.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub header: DocumentHeader,
    pub events: Vec<NoteEvent>,
    pub program: Option<u8>,
}

impl Document {
    pub fn new(header: DocumentHeader, timeline: &Timeline) -> Self {
        Self {
            header,
            events: timeline.sorted_by_start(),
            program: timeline.instrument_program,
        }
    }

    /// Header with `L:1/4`, then notes in start order with rests in the
    /// gaps, on one bar so accidentals carry across the whole line.
    ///
    /// Overlapping notes are written one after another, which moves the
    /// later ones.
    pub fn render(&self) -> Result<String, EncodeError> {
        let unit = UnitLength::QUARTER;
        let mut collector = FeedbackCollector::new();
        let key = parse_key_field(&self.header.key, &mut collector);
        let issues = collector.into_feedback().len();
        if issues > 0 {
            debug!(key = %self.header.key, issues, "key read with warnings");
        }

        let mut accidentals = key.signature();
        let mut tokens = Vec::with_capacity(self.events.len());
        // position of the text written so far, in sixteenth steps
        let mut written = 0u64;

        for (index, event) in self.events.iter().enumerate() {
            check_times(index, event)?;
            if event.pitch > 127 {
                return Err(EncodeError::PitchOutOfRange {
                    index,
                    pitch: event.pitch,
                });
            }

            let start = steps(index, "start", event.start)?;
            let duration = steps(index, "duration", event.duration)?.max(1);

            if start > written {
                tokens.push(format!("z{}", exact_token(index, "start", event.start, start - written, unit)?));
                written = start;
            } else if start < written {
                debug!(index, start = event.start, "overlapping note written late");
            }

            let pitch = spell(event.pitch, &mut accidentals);
            let token = exact_token(index, "duration", event.duration, duration, unit)?;
            tokens.push(format!("{}{}", pitch, token));
            written = written
                .checked_add(duration)
                .filter(|end| *end <= length::MAX_EXACT_STEPS)
                .ok_or(EncodeError::TooLong {
                    index,
                    field: "duration",
                    value: event.duration,
                })?;
        }

        let mut text = self.header.lines("1/4");
        if let Some(program) = self.program {
            text.push_str(&format!("%%MIDI program {program}\n"));
        }
        text.push_str(&tokens.join(" "));
        text.push_str(" |]\n");
        Ok(text)
    }
}

fn steps(index: usize, field: &'static str, value: f64) -> Result<u64, EncodeError> {
    length::exact_steps(value).ok_or(EncodeError::TooLong { index, field, value })
}

fn exact_token(
    index: usize,
    field: &'static str,
    value: f64,
    steps: u64,
    unit: UnitLength,
) -> Result<length::DurationToken, EncodeError> {
    length::encode_steps(steps, unit).ok_or(EncodeError::TooLong { index, field, value })
}

/// Spell a pitch with sharps, adding `=` or `^` only where the key and
/// the accidentals already written in this bar say otherwise.
fn spell(pitch: u8, accidentals: &mut [i8; 7]) -> String {
    // (letter, sharp) for each pitch class
    const SPELLING: [(NoteName, Accidental); 12] = [
        (NoteName::C, Accidental::Natural),
        (NoteName::C, Accidental::Sharp),
        (NoteName::D, Accidental::Natural),
        (NoteName::D, Accidental::Sharp),
        (NoteName::E, Accidental::Natural),
        (NoteName::F, Accidental::Natural),
        (NoteName::F, Accidental::Sharp),
        (NoteName::G, Accidental::Natural),
        (NoteName::G, Accidental::Sharp),
        (NoteName::A, Accidental::Natural),
        (NoteName::A, Accidental::Sharp),
        (NoteName::B, Accidental::Natural),
    ];

    let (name, accidental) = SPELLING[(pitch % 12) as usize];
    let offset = accidental.to_semitone_offset();
    let prefix = if accidentals[name.index()] == offset {
        ""
    } else {
        accidental.as_abc()
    };
    accidentals[name.index()] = offset;

    let octave = pitch as i16 / 12 - 1;
    let marks = if octave < 4 {
        ",".repeat((4 - octave) as usize)
    } else {
        "'".repeat((octave - 4) as usize)
    };
    format!("{prefix}{}{marks}", name.as_char())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_timeline() {
        let events = [NoteEvent::new(60, 100, 0.0, 2.0), NoteEvent::new(62, 90, 1.0, 2.0)];
        assert_eq!(encode_timeline(&events).unwrap().as_str(), "C2 D2");
    }

    #[test]
    fn test_encode_unmapped_duration_has_no_length() {
        let events = [NoteEvent::new(64, 100, 0.0, 0.33), NoteEvent::new(48, 100, 0.0, 8.0)];
        assert_eq!(encode_timeline(&events).unwrap().as_str(), "E C,2");
    }

    #[test]
    fn test_encode_empty() {
        let body = encode_timeline(&[]).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_encode_rejects_bad_events() {
        let err = encode_timeline(&[NoteEvent::new(200, 100, 0.0, 1.0)]).unwrap_err();
        assert!(matches!(err, EncodeError::PitchOutOfRange { index: 0, pitch: 200 }));

        let events = [NoteEvent::new(60, 100, 0.0, 1.0), NoteEvent::new(60, 100, f64::NAN, 1.0)];
        let err = encode_timeline(&events).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidTime { index: 1, field: "start", .. }));

        let err = encode_timeline(&[NoteEvent::new(60, 100, 0.0, -1.0)]).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidTime { field: "duration", .. }));
    }

    #[test]
    fn test_or_empty_collapses_failures() {
        assert_eq!(encode_timeline_or_empty(&[NoteEvent::new(200, 1, 0.0, 1.0)]), "");
        assert_eq!(encode_timeline_or_empty(&[NoteEvent::new(60, 1, 0.0, 1.0)]), "C1");
    }

    #[test]
    fn test_legacy_style() {
        let events = [NoteEvent::new(60, 100, 0.0, 1.0), NoteEvent::new(72, 100, 1.0, 1.0)];
        let body = encode_timeline_with(&events, OctaveStyle::Legacy).unwrap();
        assert_eq!(body.as_str(), "c1 c1");
    }

    #[test]
    fn test_encode_flat_notes() {
        let body = encode_flat_notes(&[60.0, 0.0, 1.0, 100.0, 0.0, 67.0, 1.0, 0.5, 100.0, 0.0]).unwrap();
        assert_eq!(body.as_str(), "C1 G/2");

        let err = encode_flat_notes(&[60.0, 0.0]).unwrap_err();
        assert!(matches!(err, EncodeError::Notes(timeline::Error::FlatArity { len: 2 })));
    }

    #[test]
    fn test_wrap_as_document() {
        let text = wrap_as_document("C2 D/2 E1", &DocumentHeader::default());
        assert_eq!(text, "X:1\nT:MelodyExample\nM:4/4\nL:1/8\nK:Emin\n|:C2D2E8:|");
    }

    #[test]
    fn test_wrap_empty_body() {
        let header = DocumentHeader::with_title("Bass");
        let text = wrap_as_document("", &header);
        assert_eq!(text, "X:1\nT:Bass\nM:4/4\nL:1/8\nK:Emin\n|::|");
    }

    #[test]
    fn test_render_with_rests_and_key() {
        let timeline = Timeline {
            events: vec![
                NoteEvent::new(64, 80, 0.0, 1.0),
                NoteEvent::new(66, 80, 1.0, 0.5),
                NoteEvent::new(65, 80, 2.0, 2.5),
                NoteEvent::new(66, 80, 4.5, 1.0),
            ],
            total_length: 6,
            instrument_program: Some(33),
        };
        let header = DocumentHeader {
            key: "G".to_string(),
            ..DocumentHeader::with_title("Walk")
        };

        let text = Document::new(header, &timeline).render().unwrap();
        assert_eq!(
            text,
            "X:1\nT:Walk\nM:4/4\nL:1/4\nK:G\n%%MIDI program 33\nE F/2 z/2 =F5/2 ^F |]\n"
        );
    }

    #[test]
    fn test_render_rejects_times_too_long_to_write() {
        let timeline = Timeline {
            events: vec![NoteEvent::new(60, 100, 0.0, 1e19)],
            ..Timeline::default()
        };
        let err = Document::new(DocumentHeader::default(), &timeline).render().unwrap_err();
        assert!(matches!(err, EncodeError::TooLong { index: 0, field: "duration", .. }));

        let timeline = Timeline {
            events: vec![NoteEvent::new(60, 100, 1e19, 1.0)],
            ..Timeline::default()
        };
        let err = Document::new(DocumentHeader::default(), &timeline).render().unwrap_err();
        assert!(matches!(err, EncodeError::TooLong { field: "start", .. }));
    }

    #[test]
    fn test_render_small_gaps_do_not_drift() {
        let events: Vec<NoteEvent> = (0..16)
            .map(|i| NoteEvent::new(60 + i as u8, 100, i as f64 * 0.53, 0.5))
            .collect();
        let timeline = Timeline {
            events: events.clone(),
            total_length: 8,
            instrument_program: None,
        };

        let text = Document::new(DocumentHeader::default(), &timeline).render().unwrap();
        let decoded = crate::decode(&text, &crate::DecodeOptions::default()).unwrap();

        assert_eq!(decoded.timeline.events.len(), events.len());
        for (got, want) in decoded.timeline.events.iter().zip(&events) {
            assert_eq!(got.pitch, want.pitch);
            assert_eq!(got.duration, 0.5);
            assert!(
                (got.start - want.start).abs() <= 1.0 / 32.0,
                "pitch {} written at {} for {}",
                want.pitch,
                got.start,
                want.start
            );
        }
    }

    #[test]
    fn test_render_rejects_bad_pitch() {
        let timeline = Timeline {
            events: vec![NoteEvent::new(128, 80, 0.0, 1.0)],
            ..Timeline::default()
        };
        let err = Document::new(DocumentHeader::default(), &timeline).render().unwrap_err();
        assert!(matches!(err, EncodeError::PitchOutOfRange { pitch: 128, .. }));
    }
}
