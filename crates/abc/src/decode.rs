//! ABC text back to a timeline.
//!
//! Reads the first voice that has notes. Times are quarter-note beats from
//! the start of that voice.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use timeline::note::round_length;
use timeline::{NoteEvent, Timeline};
use tracing::debug;

use crate::ast::{Bar, Chord, Element, Meter, Note, Rest, Tune, UnitLength};
use crate::feedback::{Feedback, FeedbackCollector, FeedbackLevel};
use crate::parser::{self, parse_key_field, parse_meter, parse_unit_length};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Velocity for every note; ABC has no dynamics the decoder reads.
    pub velocity: u8,
    /// Play `|: ... :|` sections twice instead of once.
    pub expand_repeats: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            velocity: 80,
            expand_repeats: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub timeline: Timeline,
    pub title: String,
    /// Tempo from `Q:`, as quarter notes per minute.
    pub bpm: Option<f64>,
    /// Parser warnings plus anything the walk skipped.
    pub feedback: Vec<Feedback>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{count} parse error(s), first at line {line}: {message}")]
    Parse {
        count: usize,
        line: usize,
        message: String,
        feedback: Vec<Feedback>,
    },

    #[error("velocity {0} is outside 0-127")]
    Velocity(u8),
}

/// Parse `text` and rebuild the notes of its first voice.
pub fn decode(text: &str, options: &DecodeOptions) -> Result<Decoded, DecodeError> {
    if options.velocity > 127 {
        return Err(DecodeError::Velocity(options.velocity));
    }

    let result = parser::parse(text);

    let errors: Vec<&Feedback> = result.errors().collect();
    if let Some(first) = errors.first() {
        return Err(DecodeError::Parse {
            count: errors.len(),
            line: first.line,
            message: first.message.clone(),
            feedback: result.feedback.clone(),
        });
    }

    let (timeline, walk_feedback) = decode_tune(&result.value, options);
    let mut feedback = result.feedback;
    feedback.extend(walk_feedback);

    let tune = result.value;
    let bpm = tune
        .header
        .tempo
        .as_ref()
        .map(|t| t.bpm as f64 * 4.0 * t.beat_unit.0 as f64 / t.beat_unit.1.max(1) as f64);

    Ok(Decoded {
        timeline,
        title: tune.header.title,
        bpm,
        feedback,
    })
}

/// Walk an already parsed tune. Velocities above 127 are clamped.
pub fn decode_tune(tune: &Tune, options: &DecodeOptions) -> (Timeline, Vec<Feedback>) {
    let voice = tune
        .voices
        .iter()
        .find(|v| has_notes(&v.elements))
        .or_else(|| tune.voices.first());

    let mut walker = Walker::new(tune, options);
    if let Some(voice) = voice {
        if options.expand_repeats {
            walker.walk(&expand_repeats(&voice.elements), 1.0);
        } else {
            walker.walk(&voice.elements, 1.0);
        }
    }
    walker.finish()
}

fn has_notes(elements: &[Element]) -> bool {
    elements.iter().any(|e| match e {
        Element::Note(_) | Element::Chord(_) => true,
        Element::Tuplet(t) => has_notes(&t.elements),
        _ => false,
    })
}

/// Unfold repeats: `|: A :|` plays A twice, `|: A |1 B :|2 C` plays
/// A B A C, `::` closes one section and opens the next.
fn expand_repeats(elements: &[Element]) -> Vec<Element> {
    let mut result: Vec<Element> = Vec::new();
    let mut start: Option<usize> = None;
    let mut first_ending: Option<usize> = None;

    fn replay(result: &mut Vec<Element>, start: Option<usize>, first_ending: Option<usize>, bar: Bar) {
        let from = start.map_or(0, |s| s + 1);
        let to = first_ending.unwrap_or(result.len());
        result.push(Element::Bar(bar));
        if from < to {
            let section = result[from..to].to_vec();
            result.extend(section);
        }
    }

    for element in elements {
        match element {
            Element::Bar(Bar::RepeatStart) => {
                start = Some(result.len());
                result.push(element.clone());
            }
            Element::Bar(Bar::FirstEnding) => {
                first_ending = Some(result.len());
                result.push(element.clone());
            }
            Element::Bar(Bar::RepeatEnd) => {
                replay(&mut result, start, first_ending, Bar::RepeatEnd);
                start = None;
                first_ending = None;
            }
            Element::Bar(Bar::SecondEnding) => {
                // `:|2` still owes the repeat; `[2` after `:|` does not
                if first_ending.is_some() {
                    replay(&mut result, start, first_ending, Bar::RepeatEnd);
                    start = None;
                    first_ending = None;
                }
                result.push(element.clone());
            }
            Element::Bar(Bar::RepeatBoth) => {
                replay(&mut result, start, first_ending, Bar::RepeatEnd);
                first_ending = None;
                start = Some(result.len());
                result.push(Element::Bar(Bar::RepeatStart));
            }
            _ => result.push(element.clone()),
        }
    }

    result
}

/// Tie continuations must start where the tied note ends.
const TIE_TOLERANCE: f64 = 1e-6;

struct Walker<'a> {
    options: &'a DecodeOptions,
    unit: UnitLength,
    meter: Meter,
    key: [i8; 7],
    /// Accidentals written earlier in the current bar, per letter.
    bar: [Option<i8>; 7],
    clock: f64,
    events: Vec<NoteEvent>,
    open_ties: HashMap<u8, usize>,
    program: Option<u8>,
    feedback: Vec<Feedback>,
}

impl<'a> Walker<'a> {
    fn new(tune: &Tune, options: &'a DecodeOptions) -> Self {
        let header = &tune.header;
        Self {
            options,
            unit: header.unit_length.unwrap_or_default(),
            meter: header.meter.clone().unwrap_or(Meter::Common),
            key: header.key.signature(),
            bar: [None; 7],
            clock: 0.0,
            events: Vec::new(),
            open_ties: HashMap::new(),
            program: header.midi_program,
            feedback: Vec::new(),
        }
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.feedback.push(Feedback::warning(message, 0, 0));
    }

    fn walk(&mut self, elements: &[Element], scale: f64) {
        for element in elements {
            match element {
                Element::Note(note) => {
                    let duration = note.length.beats(self.unit) * scale;
                    self.sound(note, duration);
                    self.clock += duration;
                }
                Element::Chord(chord) => self.chord(chord, scale),
                Element::Rest(rest) => self.rest(rest, scale),
                Element::Bar(_) => self.bar = [None; 7],
                Element::Tuplet(tuplet) => {
                    let ratio = tuplet.q as f64 / tuplet.p.max(1) as f64;
                    self.walk(&tuplet.elements, scale * ratio);
                }
                Element::InlineField(field) => self.inline_field(field.field_type, &field.value),
                Element::MidiProgram(program) => match self.program {
                    None => self.program = Some(*program),
                    Some(first) => debug!(first, ignored = *program, "later MIDI program ignored"),
                },
                Element::GraceNotes { .. }
                | Element::ChordSymbol(_)
                | Element::Decoration(_)
                | Element::Slur(_)
                | Element::VoiceSwitch(_) => {}
            }
        }
    }

    fn chord(&mut self, chord: &Chord, scale: f64) {
        let multiplier = chord.length.numerator as f64 / chord.length.denominator.max(1) as f64;
        let mut advance = None;
        for note in &chord.notes {
            let duration = note.length.beats(self.unit) * multiplier * scale;
            self.sound(note, duration);
            advance.get_or_insert(duration);
        }
        self.clock += advance.unwrap_or_else(|| chord.length.beats(self.unit) * scale);
    }

    fn rest(&mut self, rest: &Rest, scale: f64) {
        let duration = match rest.multi_measure {
            Some(bars) => bars as f64 * self.meter.bar_beats(),
            None => rest.length.beats(self.unit) * scale,
        };
        self.open_ties.clear();
        self.clock += duration;
    }

    /// Emit or extend one note starting at the current clock.
    fn sound(&mut self, note: &Note, duration: f64) {
        let index = note.pitch.index();
        let offset = match note.accidental {
            Some(accidental) => {
                let offset = accidental.to_semitone_offset();
                self.bar[index] = Some(offset);
                offset
            }
            None => self.bar[index].unwrap_or(self.key[index]),
        };

        let Some(pitch) = note.pitch_with(offset) else {
            self.warn(format!(
                "{}{} at beat {} is outside the MIDI range, skipped",
                note.pitch.as_char(),
                note.octave,
                self.clock
            ));
            return;
        };

        let continued = self
            .open_ties
            .remove(&pitch)
            .filter(|&i| (self.events[i].end() - self.clock).abs() < TIE_TOLERANCE);

        let event_index = match continued {
            Some(i) => {
                self.events[i].duration += duration;
                i
            }
            None => {
                self.events
                    .push(NoteEvent::new(pitch, self.options.velocity.min(127), self.clock, duration));
                self.events.len() - 1
            }
        };

        if note.tie {
            self.open_ties.insert(pitch, event_index);
        }
    }

    fn inline_field(&mut self, field: char, value: &str) {
        let mut collector = FeedbackCollector::new();
        match field {
            'L' => self.unit = parse_unit_length(value, &mut collector),
            'M' => self.meter = parse_meter(value, &mut collector),
            'K' => {
                self.key = parse_key_field(value, &mut collector).signature();
                self.bar = [None; 7];
            }
            _ => {}
        }
        self.feedback.extend(
            collector
                .into_feedback()
                .into_iter()
                .filter(|f| f.level != FeedbackLevel::Info),
        );
    }

    fn finish(self) -> (Timeline, Vec<Feedback>) {
        let timeline = Timeline {
            events: self.events,
            total_length: round_length(self.clock),
            instrument_program: self.program,
        };
        (timeline, self.feedback)
    }
}
