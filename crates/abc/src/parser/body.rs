//! Music body parsing for ABC notation.

use winnow::prelude::*;

use crate::ast::{Bar, Element, InfoField, SlurBoundary, Tuplet};
use crate::feedback::FeedbackCollector;

use super::note::{parse_chord, parse_chord_symbol, parse_note, parse_rest};
use super::{field_line, midi_directive, MidiDirective};

/// Cursor over one body line, for column reporting.
struct Line<'a> {
    start: &'a str,
    number: usize,
}

impl Line<'_> {
    fn mark(&self, rest: &str, collector: &mut FeedbackCollector) {
        collector.set_position(self.number, self.start.len() - rest.len() + 1);
    }
}

/// Parse the body section of an ABC tune.
///
/// `first_line` is the line number of the body's first line in the whole
/// document.
pub fn parse_body(input: &str, first_line: usize, collector: &mut FeedbackCollector) -> Vec<Element> {
    let mut elements = Vec::new();

    for (index, raw_line) in input.lines().enumerate() {
        let line = Line {
            start: raw_line,
            number: first_line + index,
        };
        line.mark(raw_line, collector);

        let trimmed = raw_line.trim();
        if trimmed.starts_with('%') {
            if let Some(MidiDirective::Program(program)) = midi_directive(trimmed, collector) {
                elements.push(Element::MidiProgram(program));
            }
            continue;
        }

        if let Some(element) = standalone_field(trimmed) {
            elements.push(element);
            continue;
        }

        let mut rest = raw_line;
        while !rest.is_empty() {
            rest = rest.trim_start_matches([' ', '\t']);
            if rest.is_empty() || rest.starts_with('%') {
                break;
            }
            line.mark(rest, collector);

            if let Some(element) = try_parse_element(&mut rest, collector) {
                elements.push(element);
            }
        }
    }

    elements
}

/// A whole line holding one field, e.g. `V:2` or `L:1/16`.
///
/// Lines starting with a note letter stay music even when a colon follows.
fn standalone_field(line: &str) -> Option<Element> {
    let (field, value) = field_line(line)?;
    if matches!(field, 'A'..='G' | 'a'..='g') {
        return None;
    }

    Some(match field {
        'V' => Element::VoiceSwitch(voice_id(value)),
        _ => Element::InlineField(InfoField {
            field_type: field,
            value: value.to_string(),
        }),
    })
}

fn voice_id(value: &str) -> String {
    value.split_whitespace().next().unwrap_or("1").to_string()
}

/// Parse one element, consuming at least one character.
///
/// Returns `None` for input that carries no element (skipped characters,
/// unsupported syntax), after recording feedback where it matters.
fn try_parse_element(input: &mut &str, collector: &mut FeedbackCollector) -> Option<Element> {
    if let Some(bar) = try_parse_bar(input) {
        return Some(Element::Bar(bar));
    }

    if let Some(tuplet) = try_parse_tuplet(input, collector) {
        return Some(Element::Tuplet(tuplet));
    }

    let c = input.chars().next()?;
    match c {
        '"' => {
            match parse_chord_symbol.parse_next(input) {
                Ok(symbol) => Some(Element::ChordSymbol(symbol)),
                Err(_) => {
                    collector.warning("Unterminated chord symbol, skipping rest of line");
                    *input = "";
                    None
                }
            }
        }
        '[' => try_parse_bracket(input, collector),
        'z' | 'x' | 'Z' => {
            let checkpoint = *input;
            match parse_rest.parse_next(input) {
                Ok(rest) => Some(Element::Rest(rest)),
                Err(_) => {
                    *input = &checkpoint[1..];
                    None
                }
            }
        }
        '{' => try_parse_grace_notes(input),
        '(' => {
            *input = &input[1..];
            Some(Element::Slur(SlurBoundary::Start))
        }
        ')' => {
            *input = &input[1..];
            Some(Element::Slur(SlurBoundary::End))
        }
        '>' | '<' => {
            collector.warning_with_suggestion(
                format!("Broken rhythm '{}' not supported, notes keep their written lengths", c),
                "Write the lengths out, e.g. A3/2B/2 instead of A>B",
            );
            *input = input.trim_start_matches(['>', '<']);
            None
        }
        // line continuation, beam spacing, spacer
        '\\' | '`' | 'y' | '$' => {
            *input = &input[1..];
            None
        }
        _ => {
            if let Some(decoration) = try_parse_decoration(input, collector) {
                return Some(Element::Decoration(decoration));
            }

            let checkpoint = *input;
            match parse_note.parse_next(input) {
                Ok(note) => Some(Element::Note(note)),
                Err(_) => {
                    *input = &checkpoint[c.len_utf8()..];
                    if c == '-' {
                        collector.warning("Tie without a preceding note");
                    } else {
                        collector.warning(format!("Skipping unknown character '{}'", c));
                    }
                    None
                }
            }
        }
    }
}

/// `[` starts an inline field, a numbered ending, or a chord.
fn try_parse_bracket(input: &mut &str, collector: &mut FeedbackCollector) -> Option<Element> {
    if let Some(field) = try_parse_inline_field(input) {
        if field.field_type == 'V' {
            return Some(Element::VoiceSwitch(voice_id(&field.value)));
        }
        return Some(Element::InlineField(field));
    }

    if input[1..].starts_with(|c: char| c.is_ascii_digit()) {
        let ending = if input[1..].starts_with('1') {
            Bar::FirstEnding
        } else {
            Bar::SecondEnding
        };
        *input = input[1..].trim_start_matches(|c: char| c.is_ascii_digit() || c == ',' || c == '-');
        return Some(Element::Bar(ending));
    }

    let checkpoint = *input;
    match parse_chord.parse_next(input) {
        Ok(chord) if chord.notes.is_empty() => {
            collector.warning("Empty chord");
            None
        }
        Ok(chord) => Some(Element::Chord(chord)),
        Err(_) => {
            *input = &checkpoint[1..];
            collector.error("Unterminated chord, expected ']'");
            None
        }
    }
}

fn try_parse_bar(input: &mut &str) -> Option<Bar> {
    // longest patterns first
    const BARS: [(&str, Bar); 8] = [
        ("|]", Bar::End),
        ("[|", Bar::Start),
        ("||", Bar::Double),
        ("|:", Bar::RepeatStart),
        ("::", Bar::RepeatBoth),
        ("|1", Bar::FirstEnding),
        ("|2", Bar::SecondEnding),
        ("|", Bar::Single),
    ];

    if let Some(after) = input.strip_prefix(":|") {
        return if after.starts_with(|c: char| c.is_ascii_digit()) {
            *input = after.trim_start_matches(|c: char| c.is_ascii_digit());
            Some(Bar::SecondEnding)
        } else {
            *input = after.strip_prefix(']').unwrap_or(after);
            Some(Bar::RepeatEnd)
        };
    }

    for (pattern, bar) in BARS {
        if let Some(after) = input.strip_prefix(pattern) {
            *input = after;
            return Some(bar);
        }
    }

    None
}

/// `(p`, `(p:q`, or `(p:q:r` followed by the notes it covers.
fn try_parse_tuplet(input: &mut &str, collector: &mut FeedbackCollector) -> Option<Tuplet> {
    let after_paren = input.strip_prefix('(')?;
    if !after_paren.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let (p, mut rest) = take_number(after_paren);
    let p = p.unwrap_or(3).max(1);
    let default_q = match p {
        2 | 4 | 8 => 3,
        3 | 6 => 2,
        // compound meters want 3 here; simple meters are the common case
        _ => 2,
    };

    let mut q = default_q;
    let mut r = p;
    if let Some(after) = rest.strip_prefix(':') {
        let (value, after) = take_number(after);
        q = value.unwrap_or(default_q).max(1);
        rest = after;
        if let Some(after) = rest.strip_prefix(':') {
            let (value, after) = take_number(after);
            r = value.unwrap_or(p);
            rest = after;
        }
    }
    *input = rest;

    let mut elements = Vec::new();
    let mut counted = 0;
    while counted < r {
        *input = input.trim_start_matches([' ', '\t']);
        if input.is_empty() || input.starts_with(['|', '%']) {
            break;
        }
        if let Some(element) = try_parse_element(input, collector) {
            if matches!(element, Element::Note(_) | Element::Chord(_) | Element::Rest(_)) {
                counted += 1;
            }
            elements.push(element);
        }
    }

    if counted < r {
        collector.warning(format!("Tuplet expected {} notes, found {}", r, counted));
    }

    Some(Tuplet { p, q, elements })
}

fn take_number(input: &str) -> (Option<u8>, &str) {
    let end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    (input[..end].parse().ok(), &input[end..])
}

/// `{g}` appoggiatura or `{/g}` acciaccatura
fn try_parse_grace_notes(input: &mut &str) -> Option<Element> {
    *input = input.strip_prefix('{')?;

    let acciaccatura = match input.strip_prefix('/') {
        Some(after) => {
            *input = after;
            true
        }
        None => false,
    };

    let mut notes = Vec::new();
    while !input.is_empty() && !input.starts_with('}') {
        let checkpoint = *input;
        match parse_note.parse_next(input) {
            Ok(note) => notes.push(note),
            Err(_) => {
                let skip = checkpoint.chars().next().map_or(0, char::len_utf8);
                *input = &checkpoint[skip..];
            }
        }
    }
    *input = input.strip_prefix('}').unwrap_or(*input);

    (!notes.is_empty()).then_some(Element::GraceNotes {
        acciaccatura,
        notes,
    })
}

/// `[K:Dmin]`, `[L:1/16]`, `[V:2]`
fn try_parse_inline_field(input: &mut &str) -> Option<InfoField> {
    let inner = input.strip_prefix('[')?;
    let end = inner.find(']')?;
    let (field_type, value) = field_line(&inner[..end])?;

    *input = &inner[end + 1..];
    Some(InfoField {
        field_type,
        value: value.to_string(),
    })
}

fn try_parse_decoration(input: &mut &str, collector: &mut FeedbackCollector) -> Option<String> {
    let c = input.chars().next()?;

    let shorthand = match c {
        '.' => Some("staccato"),
        '~' => Some("roll"),
        'H' => Some("fermata"),
        'L' => Some("accent"),
        'M' => Some("mordent"),
        'O' => Some("coda"),
        'P' => Some("pralltriller"),
        'S' => Some("segno"),
        'T' => Some("trill"),
        'u' => Some("upbow"),
        'v' => Some("downbow"),
        _ => None,
    };
    if let Some(name) = shorthand {
        *input = &input[1..];
        return Some(name.to_string());
    }

    if c == '!' || c == '+' {
        let inner = &input[1..];
        return match inner.find(c) {
            Some(end) => {
                let name = inner[..end].to_string();
                *input = &inner[end + 1..];
                Some(name)
            }
            None => {
                collector.warning(format!("Unterminated decoration '{}'", c));
                *input = inner;
                None
            }
        };
    }

    None
}
