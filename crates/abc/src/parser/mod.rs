//! ABC notation parser using winnow.
//!
//! The parser is generous: it keeps going past anything it does not
//! understand and reports it as feedback instead.

mod body;
mod header;
mod key;
mod note;

pub(crate) use header::{parse_meter, parse_unit_length};
pub(crate) use key::parse_key_field;
pub use note::parse_length;
pub(crate) use note::{parse_accidental, parse_octave_marks, parse_pitch};

use crate::ast::{Element, Tune, Voice, VoiceDef};
use crate::feedback::{FeedbackCollector, ParseResult};

/// Parse ABC notation into a Tune AST.
pub fn parse(input: &str) -> ParseResult<Tune> {
    let mut collector = FeedbackCollector::new();

    let (end, header) = header::parse_header(input, &mut collector);
    let elements = body::parse_body(end.body, end.line, &mut collector);
    let voices = route_elements_to_voices(&header.voice_defs, elements);

    ParseResult::new(Tune { header, voices }, collector.into_feedback())
}

/// `%%MIDI` directives the codec cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MidiDirective {
    Program(u8),
    Channel(u8),
}

/// Recognize `%%MIDI program [channel] N` and `%%MIDI channel N`.
///
/// Returns `None` for plain comments and other directives.
pub(crate) fn midi_directive(line: &str, collector: &mut FeedbackCollector) -> Option<MidiDirective> {
    let rest = line.trim().strip_prefix("%%MIDI")?;
    let mut words = rest.split_whitespace();
    let command = words.next()?;
    // the number that matters is always last
    let number = words.last().and_then(|w| w.parse::<u8>().ok());

    match (command, number) {
        ("program", Some(program)) if program <= 127 => Some(MidiDirective::Program(program)),
        ("program", _) => {
            collector.warning(format!("Invalid MIDI program in '{}'", line.trim()));
            None
        }
        ("channel", Some(channel)) => Some(MidiDirective::Channel(channel)),
        _ => None,
    }
}

/// Split a `X:value` field line into its letter and trimmed value.
pub(crate) fn field_line(line: &str) -> Option<(char, &str)> {
    let mut chars = line.chars();
    let field = chars.next().filter(|c| c.is_ascii_alphabetic())?;
    let value = chars.as_str().strip_prefix(':')?;
    Some((field, value.trim()))
}

/// Assign body elements to voices at each `V:` switch.
///
/// Elements before the first switch go to the first declared voice, or to
/// an anonymous voice when nothing is declared. Voices keep declaration
/// order, then order of first appearance.
fn route_elements_to_voices(voice_defs: &[VoiceDef], elements: Vec<Element>) -> Vec<Voice> {
    let mut voices: Vec<Voice> = voice_defs
        .iter()
        .map(|def| Voice {
            id: Some(def.id.clone()),
            name: def.name.clone(),
            elements: Vec::new(),
        })
        .collect();

    if voices.is_empty() {
        voices.push(Voice::default());
    }
    let mut current = 0;

    for element in elements {
        match element {
            Element::VoiceSwitch(id) => {
                current = match voices.iter().position(|v| v.id.as_deref() == Some(id.as_str())) {
                    Some(index) => index,
                    None if voices.len() == 1
                        && voices[0].id.is_none()
                        && voices[0].elements.is_empty() =>
                    {
                        voices[0].id = Some(id);
                        0
                    }
                    None => {
                        voices.push(Voice {
                            id: Some(id),
                            name: None,
                            elements: Vec::new(),
                        });
                        voices.len() - 1
                    }
                };
            }
            other => voices[current].elements.push(other),
        }
    }

    // an anonymous lead-in with nothing in it is noise
    if voices.len() > 1 && voices[0].id.is_none() && voices[0].elements.is_empty() {
        voices.remove(0);
    }

    voices
}
