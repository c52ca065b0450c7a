//! Syntax tree for ABC tunes.
//!
//! Covers what the decoder needs to rebuild note events, plus the
//! structural elements a model tends to emit (decorations, chord symbols,
//! grace notes) so they can be skipped deliberately rather than rejected.

use serde::{Deserialize, Serialize};

/// A complete ABC tune
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tune {
    pub header: Header,
    pub voices: Vec<Voice>,
}

impl Default for Tune {
    fn default() -> Self {
        Tune {
            header: Header::default(),
            voices: vec![Voice::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub reference: u32,
    pub title: String,
    pub key: Key,
    pub meter: Option<Meter>,
    pub unit_length: Option<UnitLength>,
    pub tempo: Option<Tempo>,
    pub voice_defs: Vec<VoiceDef>,
    /// Fields kept verbatim (composer, rhythm, ...)
    pub other_fields: Vec<InfoField>,
    /// `%%MIDI program N`, first one wins
    pub midi_program: Option<u8>,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            reference: 1,
            title: String::new(),
            key: Key::default(),
            meter: None,
            unit_length: None,
            tempo: None,
            voice_defs: Vec::new(),
            other_fields: Vec::new(),
            midi_program: None,
        }
    }
}

/// Key signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub root: NoteName,
    pub accidental: Option<Accidental>,
    pub mode: Mode,
    /// Extra accidentals written after the mode, e.g. `K:D ^c`
    pub explicit_accidentals: Vec<(Accidental, NoteName)>,
}

impl Default for Key {
    fn default() -> Self {
        Key {
            root: NoteName::C,
            accidental: None,
            mode: Mode::Major,
            explicit_accidentals: Vec::new(),
        }
    }
}

impl Key {
    /// Position on the circle of fifths: positive is sharps, negative flats.
    pub fn fifths(&self) -> i8 {
        let letter = match self.root {
            NoteName::F => -1,
            NoteName::C => 0,
            NoteName::G => 1,
            NoteName::D => 2,
            NoteName::A => 3,
            NoteName::E => 4,
            NoteName::B => 5,
        };
        let accidental = self.accidental.map_or(0, |a| a.to_semitone_offset()) * 7;
        letter + accidental + self.mode.fifths_from_major()
    }

    /// Semitone offset the key applies to each letter, indexed by
    /// [`NoteName::index`].
    pub fn signature(&self) -> [i8; 7] {
        const SHARP_ORDER: [NoteName; 7] = [
            NoteName::F,
            NoteName::C,
            NoteName::G,
            NoteName::D,
            NoteName::A,
            NoteName::E,
            NoteName::B,
        ];

        let mut signature = [0i8; 7];
        let fifths = self.fifths();
        if fifths >= 0 {
            for name in SHARP_ORDER.iter().take(fifths.min(7) as usize) {
                signature[name.index()] = 1;
            }
        } else {
            for name in SHARP_ORDER.iter().rev().take((-fifths).min(7) as usize) {
                signature[name.index()] = -1;
            }
        }

        for (accidental, name) in &self.explicit_accidentals {
            signature[name.index()] = accidental.to_semitone_offset();
        }
        signature
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    /// Semitone offset from C (0-11)
    pub fn to_semitone(&self) -> i8 {
        match self {
            NoteName::C => 0,
            NoteName::D => 2,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::G => 7,
            NoteName::A => 9,
            NoteName::B => 11,
        }
    }

    /// Position in C D E F G A B
    pub fn index(&self) -> usize {
        match self {
            NoteName::C => 0,
            NoteName::D => 1,
            NoteName::E => 2,
            NoteName::F => 3,
            NoteName::G => 4,
            NoteName::A => 5,
            NoteName::B => 6,
        }
    }

    pub fn from_char(c: char) -> Option<NoteName> {
        match c.to_ascii_uppercase() {
            'C' => Some(NoteName::C),
            'D' => Some(NoteName::D),
            'E' => Some(NoteName::E),
            'F' => Some(NoteName::F),
            'G' => Some(NoteName::G),
            'A' => Some(NoteName::A),
            'B' => Some(NoteName::B),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            NoteName::C => 'C',
            NoteName::D => 'D',
            NoteName::E => 'E',
            NoteName::F => 'F',
            NoteName::G => 'G',
            NoteName::A => 'A',
            NoteName::B => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accidental {
    DoubleSharp,
    Sharp,
    Natural,
    Flat,
    DoubleFlat,
}

impl Accidental {
    pub fn to_semitone_offset(&self) -> i8 {
        match self {
            Accidental::DoubleSharp => 2,
            Accidental::Sharp => 1,
            Accidental::Natural => 0,
            Accidental::Flat => -1,
            Accidental::DoubleFlat => -2,
        }
    }

    /// ABC spelling (`^`, `_`, `=`, ...)
    pub fn as_abc(&self) -> &'static str {
        match self {
            Accidental::DoubleSharp => "^^",
            Accidental::Sharp => "^",
            Accidental::Natural => "=",
            Accidental::Flat => "_",
            Accidental::DoubleFlat => "__",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    #[default]
    Major,
    Minor,
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
}

impl Mode {
    /// Parse mode from string (case-insensitive, allows abbreviations)
    pub fn parse(s: &str) -> Option<Mode> {
        let s = s.to_lowercase();
        match s.as_str() {
            "maj" | "major" | "" => Some(Mode::Major),
            "min" | "minor" | "m" => Some(Mode::Minor),
            "ion" | "ionian" => Some(Mode::Ionian),
            "dor" | "dorian" => Some(Mode::Dorian),
            "phr" | "phrygian" => Some(Mode::Phrygian),
            "lyd" | "lydian" => Some(Mode::Lydian),
            "mix" | "mixolydian" => Some(Mode::Mixolydian),
            "aeo" | "aeolian" => Some(Mode::Aeolian),
            "loc" | "locrian" => Some(Mode::Locrian),
            _ => None,
        }
    }

    fn fifths_from_major(&self) -> i8 {
        match self {
            Mode::Major | Mode::Ionian => 0,
            Mode::Lydian => 1,
            Mode::Mixolydian => -1,
            Mode::Dorian => -2,
            Mode::Minor | Mode::Aeolian => -3,
            Mode::Phrygian => -4,
            Mode::Locrian => -5,
        }
    }
}

/// Meter/time signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Meter {
    Simple { numerator: u8, denominator: u8 },
    Common, // C = 4/4
    Cut,    // C| = 2/2
    None,   // Free meter
}

impl Meter {
    pub fn to_fraction(&self) -> (u8, u8) {
        match self {
            Meter::Simple {
                numerator,
                denominator,
            } => (*numerator, *denominator),
            Meter::Common => (4, 4),
            Meter::Cut => (2, 2),
            Meter::None => (4, 4),
        }
    }

    /// Bar length in quarter-note beats.
    pub fn bar_beats(&self) -> f64 {
        let (numerator, denominator) = self.to_fraction();
        numerator as f64 * 4.0 / denominator.max(1) as f64
    }
}

/// Unit note length (L: field), as a fraction of a whole note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitLength {
    pub numerator: u8,
    pub denominator: u8,
}

impl Default for UnitLength {
    fn default() -> Self {
        UnitLength {
            numerator: 1,
            denominator: 8,
        }
    }
}

impl UnitLength {
    pub const QUARTER: UnitLength = UnitLength {
        numerator: 1,
        denominator: 4,
    };

    /// Length of one unit in quarter-note beats.
    pub fn beats(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator.max(1) as f64
    }
}

/// Tempo (Q: field)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    pub beat_unit: (u8, u8),
    pub bpm: u16,
    pub text: Option<String>,
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo {
            beat_unit: (1, 4),
            bpm: 120,
            text: None,
        }
    }
}

/// Generic info field (header leftovers and inline `[X:...]` fields)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoField {
    pub field_type: char,
    pub value: String,
}

/// V: field in the header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDef {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Voice {
    pub id: Option<String>,
    pub name: Option<String>,
    pub elements: Vec<Element>,
}

/// A music element in the body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Note(Note),
    Chord(Chord),
    Rest(Rest),
    Bar(Bar),
    Tuplet(Tuplet),
    GraceNotes {
        acciaccatura: bool,
        notes: Vec<Note>,
    },
    ChordSymbol(String),
    InlineField(InfoField),
    /// `!name!` or a one-character shorthand, kept by name
    Decoration(String),
    Slur(SlurBoundary),
    VoiceSwitch(String),
    /// `%%MIDI program N` inside the body
    MidiProgram(u8),
}

/// A single note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: NoteName,
    /// 0 = `C`-`B` (MIDI 60-71), 1 = `c`-`b`, -1 = `C,`-`B,`
    pub octave: i8,
    pub accidental: Option<Accidental>,
    pub length: Length,
    pub tie: bool,
}

impl Note {
    pub fn new(pitch: NoteName, octave: i8) -> Self {
        Note {
            pitch,
            octave,
            accidental: None,
            length: Length::default(),
            tie: false,
        }
    }

    /// MIDI pitch from the written spelling, ignoring key and bar context.
    ///
    /// `None` when the result falls outside 0-127.
    pub fn written_pitch(&self) -> Option<u8> {
        self.pitch_with(self.accidental.map_or(0, |a| a.to_semitone_offset()))
    }

    /// MIDI pitch with an externally resolved accidental offset.
    pub fn pitch_with(&self, accidental_offset: i8) -> Option<u8> {
        let pitch = (self.octave as i16 + 5) * 12
            + self.pitch.to_semitone() as i16
            + accidental_offset as i16;
        u8::try_from(pitch).ok().filter(|p| *p <= 127)
    }
}

/// Length multiplier relative to the unit length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Length {
    pub numerator: u16,
    pub denominator: u16,
}

impl Length {
    pub fn new(numerator: u16, denominator: u16) -> Self {
        Length {
            numerator,
            denominator,
        }
    }

    pub fn unit() -> Self {
        Length::new(1, 1)
    }

    /// Quarter-note beats under the given unit length.
    pub fn beats(&self, unit: UnitLength) -> f64 {
        self.numerator as f64 / self.denominator.max(1) as f64 * unit.beats()
    }
}

impl Default for Length {
    fn default() -> Self {
        Self::unit()
    }
}

/// Chord (simultaneous notes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    pub notes: Vec<Note>,
    pub length: Length,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rest {
    pub length: Length,
    /// `z` is visible, `x` is not
    pub visible: bool,
    /// `Z4` = 4 bars
    pub multi_measure: Option<u16>,
}

/// Bar line types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Bar {
    Single,       // |
    Double,       // ||
    End,          // |]
    Start,        // [|
    RepeatStart,  // |:
    RepeatEnd,    // :|
    RepeatBoth,   // ::
    FirstEnding,  // |1
    SecondEnding, // :|2
}

/// `(p:q:r` tuplet: p notes in the time of q
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuplet {
    pub p: u8,
    pub q: u8,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlurBoundary {
    Start,
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_written_pitch() {
        assert_eq!(Note::new(NoteName::C, 0).written_pitch(), Some(60));
        assert_eq!(Note::new(NoteName::C, 1).written_pitch(), Some(72));
        assert_eq!(Note::new(NoteName::C, -1).written_pitch(), Some(48));
        assert_eq!(Note::new(NoteName::G, 5).written_pitch(), Some(127));
        assert_eq!(Note::new(NoteName::A, 5).written_pitch(), None);
        assert_eq!(Note::new(NoteName::C, -6).written_pitch(), None);
    }

    #[test]
    fn test_note_with_accidental() {
        let mut c_sharp = Note::new(NoteName::C, 0);
        c_sharp.accidental = Some(Accidental::Sharp);
        assert_eq!(c_sharp.written_pitch(), Some(61));

        let mut b_flat = Note::new(NoteName::B, -1);
        b_flat.accidental = Some(Accidental::Flat);
        assert_eq!(b_flat.written_pitch(), Some(58));
    }

    #[test]
    fn test_length_beats() {
        let eighth = UnitLength::default();
        assert_eq!(Length::unit().beats(eighth), 0.5);
        assert_eq!(Length::new(2, 1).beats(eighth), 1.0);
        assert_eq!(Length::new(3, 2).beats(UnitLength::QUARTER), 1.5);
        assert_eq!(Length::new(1, 4).beats(UnitLength::QUARTER), 0.25);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("maj"), Some(Mode::Major));
        assert_eq!(Mode::parse("m"), Some(Mode::Minor));
        assert_eq!(Mode::parse("min"), Some(Mode::Minor));
        assert_eq!(Mode::parse("Mixolydian"), Some(Mode::Mixolydian));
        assert_eq!(Mode::parse("invalid"), None);
    }

    #[test]
    fn test_key_signature() {
        let e_minor = Key {
            root: NoteName::E,
            mode: Mode::Minor,
            ..Key::default()
        };
        assert_eq!(e_minor.fifths(), 1);
        assert_eq!(e_minor.signature()[NoteName::F.index()], 1);
        assert_eq!(e_minor.signature()[NoteName::C.index()], 0);

        let b_flat = Key {
            root: NoteName::B,
            accidental: Some(Accidental::Flat),
            ..Key::default()
        };
        assert_eq!(b_flat.fifths(), -2);
        let signature = b_flat.signature();
        assert_eq!(signature[NoteName::B.index()], -1);
        assert_eq!(signature[NoteName::E.index()], -1);
        assert_eq!(signature[NoteName::A.index()], 0);

        let d_dorian = Key {
            root: NoteName::D,
            mode: Mode::Dorian,
            ..Key::default()
        };
        assert_eq!(d_dorian.signature(), [0; 7]);
    }

    #[test]
    fn test_key_explicit_accidentals() {
        let key = Key {
            root: NoteName::D,
            explicit_accidentals: vec![(Accidental::Natural, NoteName::C)],
            ..Key::default()
        };
        let signature = key.signature();
        assert_eq!(signature[NoteName::F.index()], 1);
        assert_eq!(signature[NoteName::C.index()], 0);
    }

    #[test]
    fn test_meter_bar_beats() {
        assert_eq!(Meter::Common.bar_beats(), 4.0);
        assert_eq!(Meter::Cut.bar_beats(), 4.0);
        let six_eight = Meter::Simple {
            numerator: 6,
            denominator: 8,
        };
        assert_eq!(six_eight.bar_beats(), 3.0);
    }
}
