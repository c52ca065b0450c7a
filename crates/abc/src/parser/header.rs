//! Header field parsing for ABC notation.

use crate::ast::{Header, InfoField, Meter, Tempo, UnitLength, VoiceDef};
use crate::feedback::FeedbackCollector;

use super::key::parse_key_field;
use super::{field_line, midi_directive, MidiDirective};

/// Where the body starts after the header.
pub struct HeaderEnd<'a> {
    pub body: &'a str,
    /// 1-based line number of the first body line
    pub line: usize,
}

/// Parse header fields up to and including `K:`.
///
/// The header also ends at the first line that is not a field, with a
/// warning when no `K:` was seen.
pub fn parse_header<'a>(input: &'a str, collector: &mut FeedbackCollector) -> (HeaderEnd<'a>, Header) {
    let mut header = Header::default();
    let mut offset = 0;
    let mut line_num = 1;
    let mut found_x = false;
    let mut found_k = false;

    for raw_line in input.split_inclusive('\n') {
        collector.set_position(line_num, 1);
        let trimmed = raw_line.trim();

        if trimmed.is_empty() {
            offset += raw_line.len();
            line_num += 1;
            continue;
        }

        if trimmed.starts_with('%') {
            if let Some(MidiDirective::Program(program)) = midi_directive(trimmed, collector) {
                header.midi_program.get_or_insert(program);
            }
            offset += raw_line.len();
            line_num += 1;
            continue;
        }

        let Some((field, value)) = field_line(trimmed) else {
            if !found_k {
                collector.warning_with_suggestion(
                    "Body started before K: field",
                    "Add a K: field before the music (e.g., K:C for C major)",
                );
            }
            break;
        };

        match field {
            'X' => {
                found_x = true;
                header.reference = value.parse().unwrap_or_else(|_| {
                    collector.warning("Invalid X: value, using 1");
                    1
                });
            }
            'T' => {
                if header.title.is_empty() {
                    header.title = value.to_string();
                } else {
                    header.other_fields.push(InfoField {
                        field_type: 'T',
                        value: value.to_string(),
                    });
                }
            }
            'M' => header.meter = Some(parse_meter(value, collector)),
            'L' => header.unit_length = Some(parse_unit_length(value, collector)),
            'Q' => header.tempo = Some(parse_tempo(value, collector)),
            'V' => header.voice_defs.push(parse_voice_def(value)),
            'K' => {
                header.key = parse_key_field(value, collector);
                found_k = true;
            }
            _ => header.other_fields.push(InfoField {
                field_type: field,
                value: value.to_string(),
            }),
        }

        offset += raw_line.len();
        line_num += 1;

        if found_k {
            break;
        }
    }

    collector.set_position(1, 1);
    if !found_x {
        collector.warning_with_suggestion(
            "Missing X: field, assuming X:1",
            "Add X:1 at the start of the tune",
        );
    }

    if !found_k {
        collector.warning_with_suggestion(
            "Missing K: field, assuming K:C",
            "Add a K: field to specify the key signature",
        );
    }

    if header.meter.is_none() {
        collector.info("Missing M: field, assuming 4/4");
        header.meter = Some(Meter::Simple {
            numerator: 4,
            denominator: 4,
        });
    }

    if header.unit_length.is_none() {
        let inferred = infer_unit_length(&header.meter);
        collector.info(format!(
            "No L: field, inferring L:{}/{}",
            inferred.numerator, inferred.denominator
        ));
        header.unit_length = Some(inferred);
    }

    (
        HeaderEnd {
            body: &input[offset..],
            line: line_num,
        },
        header,
    )
}

/// Parse meter field value (e.g., "4/4", "C", "C|", "6/8")
pub(crate) fn parse_meter(value: &str, collector: &mut FeedbackCollector) -> Meter {
    let trimmed = value.trim();

    match trimmed {
        "C" => Meter::Common,
        "C|" => Meter::Cut,
        "none" | "free" => Meter::None,
        _ => match parse_fraction(trimmed) {
            Some((numerator, denominator)) if denominator > 0 => Meter::Simple {
                numerator,
                denominator,
            },
            _ => {
                collector.warning(format!("Invalid meter '{}', assuming 4/4", trimmed));
                Meter::Simple {
                    numerator: 4,
                    denominator: 4,
                }
            }
        },
    }
}

/// Parse unit length field value (e.g., "1/8", "1/16")
pub(crate) fn parse_unit_length(value: &str, collector: &mut FeedbackCollector) -> UnitLength {
    match parse_fraction(value.trim()) {
        Some((numerator, denominator)) if numerator > 0 && denominator > 0 => UnitLength {
            numerator,
            denominator,
        },
        _ => {
            collector.warning(format!("Invalid unit length '{}', assuming 1/8", value.trim()));
            UnitLength::default()
        }
    }
}

/// Parse tempo field value (e.g., "1/4=120", "120", "\"Allegro\" 1/4=120")
fn parse_tempo(value: &str, collector: &mut FeedbackCollector) -> Tempo {
    let trimmed = value.trim();

    let (text, rest) = match trimmed.strip_prefix('"').and_then(|s| s.split_once('"')) {
        Some((text, rest)) => (Some(text.to_string()), rest.trim()),
        None => (None, trimmed),
    };

    if let Some((beat_part, bpm_part)) = rest.split_once('=') {
        let beat_unit = parse_fraction(beat_part.trim()).unwrap_or_else(|| {
            collector.warning("Invalid tempo beat unit, assuming 1/4");
            (1, 4)
        });
        let bpm = bpm_part.trim().parse().unwrap_or_else(|_| {
            collector.warning("Invalid BPM, assuming 120");
            120
        });
        Tempo {
            beat_unit,
            bpm,
            text,
        }
    } else if let Ok(bpm) = rest.parse::<u16>() {
        Tempo {
            beat_unit: (1, 4),
            bpm,
            text,
        }
    } else {
        if text.is_none() {
            collector.warning(format!("Invalid tempo '{}', assuming 120 BPM", trimmed));
        }
        Tempo {
            text,
            ..Tempo::default()
        }
    }
}

fn parse_fraction(s: &str) -> Option<(u8, u8)> {
    let (numerator, denominator) = s.split_once('/')?;
    Some((numerator.trim().parse().ok()?, denominator.trim().parse().ok()?))
}

/// Unit length implied by the meter when L: is absent
fn infer_unit_length(meter: &Option<Meter>) -> UnitLength {
    match meter {
        Some(Meter::Simple {
            numerator,
            denominator,
        }) if (*numerator as f32 / *denominator as f32) < 0.75 => UnitLength {
            numerator: 1,
            denominator: 16,
        },
        _ => UnitLength::default(),
    }
}

/// `V:id [name="..."]`; other voice properties are ignored.
pub(crate) fn parse_voice_def(value: &str) -> VoiceDef {
    let trimmed = value.trim();
    let id = trimmed.split_whitespace().next().unwrap_or("1").to_string();

    let name = trimmed
        .split_once("name=\"")
        .and_then(|(_, after)| after.split_once('"'))
        .map(|(name, _)| name.to_string());

    VoiceDef { id, name }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meter() {
        let mut collector = FeedbackCollector::new();
        assert_eq!(parse_meter("C", &mut collector), Meter::Common);
        assert_eq!(parse_meter("C|", &mut collector), Meter::Cut);
        assert_eq!(
            parse_meter("6/8", &mut collector),
            Meter::Simple {
                numerator: 6,
                denominator: 8
            }
        );
        assert!(collector.into_feedback().is_empty());
    }

    #[test]
    fn test_parse_meter_invalid() {
        let mut collector = FeedbackCollector::new();
        assert_eq!(
            parse_meter("4/0", &mut collector),
            Meter::Simple {
                numerator: 4,
                denominator: 4
            }
        );
        assert_eq!(collector.into_feedback().len(), 1);
    }

    #[test]
    fn test_parse_tempo() {
        let mut collector = FeedbackCollector::new();
        let tempo = parse_tempo("1/4=120", &mut collector);
        assert_eq!((tempo.beat_unit, tempo.bpm), ((1, 4), 120));

        let tempo = parse_tempo("\"Allegro\" 1/4=144", &mut collector);
        assert_eq!(tempo.bpm, 144);
        assert_eq!(tempo.text.as_deref(), Some("Allegro"));

        let tempo = parse_tempo("100", &mut collector);
        assert_eq!(tempo.bpm, 100);
        assert!(collector.into_feedback().is_empty());
    }

    #[test]
    fn test_infer_unit_length() {
        let six_eight = Some(Meter::Simple {
            numerator: 6,
            denominator: 8,
        });
        assert_eq!(infer_unit_length(&six_eight).denominator, 8);

        let two_four = Some(Meter::Simple {
            numerator: 2,
            denominator: 4,
        });
        assert_eq!(infer_unit_length(&two_four).denominator, 16);
    }

    #[test]
    fn test_parse_voice_def() {
        let voice = parse_voice_def("Lead name=\"Lead Melody\" clef=treble");
        assert_eq!(voice.id, "Lead");
        assert_eq!(voice.name.as_deref(), Some("Lead Melody"));

        assert_eq!(parse_voice_def("2").name, None);
    }

    #[test]
    fn test_header_end_position() {
        let mut collector = FeedbackCollector::new();
        let (end, header) = parse_header("X:1\nT:Tune\n%%MIDI program 40\nK:G\nGAB|\n", &mut collector);
        assert_eq!(end.body, "GAB|\n");
        assert_eq!(end.line, 5);
        assert_eq!(header.title, "Tune");
        assert_eq!(header.midi_program, Some(40));
    }
}
