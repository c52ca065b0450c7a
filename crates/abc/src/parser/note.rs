//! Note, chord, and rest parsing using winnow combinators.

use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::ast::{Accidental, Chord, Length, Note, NoteName, Rest};

type PResult<T> = winnow::ModalResult<T>;

/// Letter and base octave: uppercase is octave 0, lowercase octave 1.
pub fn parse_pitch(input: &mut &str) -> PResult<(NoteName, i8)> {
    let c = one_of(['C', 'D', 'E', 'F', 'G', 'A', 'B', 'c', 'd', 'e', 'f', 'g', 'a', 'b'])
        .parse_next(input)?;
    let octave = if c.is_ascii_lowercase() { 1 } else { 0 };
    // one_of only lets letters A-G through
    let name = NoteName::from_char(c).unwrap_or(NoteName::C);
    Ok((name, octave))
}

pub fn parse_accidental(input: &mut &str) -> PResult<Accidental> {
    alt((
        "^^".value(Accidental::DoubleSharp),
        "^".value(Accidental::Sharp),
        "__".value(Accidental::DoubleFlat),
        "_".value(Accidental::Flat),
        "=".value(Accidental::Natural),
    ))
    .parse_next(input)
}

/// Net octave shift from any run of `'` and `,`.
pub fn parse_octave_marks(input: &mut &str) -> PResult<i8> {
    let marks: &str = take_while(0.., ['\'', ',']).parse_next(input)?;
    let shift = marks
        .chars()
        .map(|c| if c == '\'' { 1i16 } else { -1 })
        .sum::<i16>();
    Ok(shift.clamp(i8::MIN as i16, i8::MAX as i16) as i8)
}

/// Length multiplier: `2`, `/2`, `3/2`, `/`, `//`, `3/`, or nothing.
///
/// A bare run of k slashes divides by 2^k.
pub fn parse_length(input: &mut &str) -> PResult<Length> {
    let digits: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let numerator = if digits.is_empty() {
        1
    } else {
        digits.parse().unwrap_or(u16::MAX)
    };

    let slashes: &str = take_while(0.., '/').parse_next(input)?;
    let denominator = match slashes.len() {
        0 => 1,
        1 => {
            let digits: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
            if digits.is_empty() {
                2
            } else {
                digits.parse().unwrap_or(u16::MAX)
            }
        }
        n => 1u16.checked_shl(n as u32).unwrap_or(u16::MAX),
    };

    Ok(Length {
        numerator,
        denominator,
    })
}

pub fn parse_note(input: &mut &str) -> PResult<Note> {
    let accidental = opt(parse_accidental).parse_next(input)?;
    let (pitch, base_octave) = parse_pitch(input)?;
    let shift = parse_octave_marks(input)?;
    let length = parse_length(input)?;
    let tie = opt('-').parse_next(input)?.is_some();

    Ok(Note {
        pitch,
        octave: base_octave.saturating_add(shift),
        accidental,
        length,
        tie,
    })
}

/// `z` (rest), `x` (invisible rest), `Z` (multi-measure rest)
pub fn parse_rest(input: &mut &str) -> PResult<Rest> {
    let rest_char = one_of(['z', 'x', 'Z']).parse_next(input)?;

    if rest_char == 'Z' {
        let count: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
        return Ok(Rest {
            length: Length::unit(),
            visible: true,
            multi_measure: Some(count.parse().unwrap_or(1)),
        });
    }

    Ok(Rest {
        length: parse_length(input)?,
        visible: rest_char == 'z',
        multi_measure: None,
    })
}

/// `[CEG]2`: notes inside brackets, then one length for the whole chord.
///
/// A chord length multiplies each inner note's own length.
pub fn parse_chord(input: &mut &str) -> PResult<Chord> {
    '['.parse_next(input)?;

    let mut notes = Vec::new();
    loop {
        *input = input.trim_start_matches([' ', '\t']);
        let checkpoint = *input;
        match parse_note.parse_next(input) {
            Ok(note) => notes.push(note),
            Err(_) => {
                *input = checkpoint;
                break;
            }
        }
    }

    ']'.parse_next(input)?;
    let length = parse_length(input)?;
    // A trailing tie after the bracket ties every note
    if opt('-').parse_next(input)?.is_some() {
        for note in &mut notes {
            note.tie = true;
        }
    }

    Ok(Chord { notes, length })
}

/// `"Am7"` chord symbol or `"^text"` annotation; commas inside are kept.
pub fn parse_chord_symbol(input: &mut &str) -> PResult<String> {
    '"'.parse_next(input)?;
    let symbol: &str = take_while(0.., |c: char| c != '"' && c != '\n').parse_next(input)?;
    '"'.parse_next(input)?;
    Ok(symbol.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pitch() {
        let mut input = "C";
        assert_eq!(parse_pitch(&mut input).unwrap(), (NoteName::C, 0));

        let mut input = "c";
        assert_eq!(parse_pitch(&mut input).unwrap(), (NoteName::C, 1));

        let mut input = "H";
        assert!(parse_pitch(&mut input).is_err());
    }

    #[test]
    fn test_parse_accidental() {
        let mut input = "^";
        assert_eq!(parse_accidental(&mut input).unwrap(), Accidental::Sharp);

        let mut input = "^^";
        assert_eq!(parse_accidental(&mut input).unwrap(), Accidental::DoubleSharp);

        let mut input = "__";
        assert_eq!(parse_accidental(&mut input).unwrap(), Accidental::DoubleFlat);

        let mut input = "=";
        assert_eq!(parse_accidental(&mut input).unwrap(), Accidental::Natural);
    }

    #[test]
    fn test_parse_octave_marks() {
        let mut input = "''";
        assert_eq!(parse_octave_marks(&mut input).unwrap(), 2);

        let mut input = ",,";
        assert_eq!(parse_octave_marks(&mut input).unwrap(), -2);

        let mut input = "";
        assert_eq!(parse_octave_marks(&mut input).unwrap(), 0);
    }

    #[test]
    fn test_parse_length() {
        let cases = [
            ("2", Length::new(2, 1)),
            ("/2", Length::new(1, 2)),
            ("/", Length::new(1, 2)),
            ("//", Length::new(1, 4)),
            ("3/2", Length::new(3, 2)),
            ("3/", Length::new(3, 2)),
            ("3/4", Length::new(3, 4)),
            ("", Length::new(1, 1)),
        ];
        for (text, expected) in cases {
            let mut input = text;
            assert_eq!(parse_length(&mut input).unwrap(), expected, "length {text:?}");
            assert!(input.is_empty());
        }
    }

    #[test]
    fn test_parse_note() {
        let mut input = "c'";
        let note = parse_note(&mut input).unwrap();
        assert_eq!(note.octave, 2);

        let mut input = "^C,2";
        let note = parse_note(&mut input).unwrap();
        assert_eq!(note.accidental, Some(Accidental::Sharp));
        assert_eq!(note.octave, -1);
        assert_eq!(note.length, Length::new(2, 1));

        let mut input = "C-";
        assert!(parse_note(&mut input).unwrap().tie);
    }

    #[test]
    fn test_parse_rest() {
        let mut input = "z2";
        let rest = parse_rest(&mut input).unwrap();
        assert!(rest.visible);
        assert_eq!(rest.length, Length::new(2, 1));

        let mut input = "x";
        assert!(!parse_rest(&mut input).unwrap().visible);

        let mut input = "Z4";
        assert_eq!(parse_rest(&mut input).unwrap().multi_measure, Some(4));
    }

    #[test]
    fn test_parse_chord() {
        let mut input = "[CEG]2";
        let chord = parse_chord(&mut input).unwrap();
        assert_eq!(chord.notes.len(), 3);
        assert_eq!(chord.notes[2].pitch, NoteName::G);
        assert_eq!(chord.length, Length::new(2, 1));

        let mut input = "[CE";
        assert!(parse_chord(&mut input).is_err());
    }

    #[test]
    fn test_parse_chord_symbol() {
        let mut input = "\"Am7\"";
        assert_eq!(parse_chord_symbol(&mut input).unwrap(), "Am7");

        let mut input = "\"\"";
        assert_eq!(parse_chord_symbol(&mut input).unwrap(), "");
    }
}
