//! Standard MIDI File bridge.
//!
//! Reading flattens every track into one chronological signal stream;
//! writing produces a format 0 file from a timeline.

use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::note::Timeline;
use crate::signal::{Signal, SignalKind};
use crate::{Error, Result};

const DEFAULT_TEMPO_USEC: u32 = 500_000;
const TIMECODE_FALLBACK_PPQ: u16 = 480;

/// Unit of the signal deltas produced from a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    /// Quarter-note beats, tempo-independent.
    #[default]
    Beats,
    /// Wall-clock seconds through the tempo map.
    Seconds,
}

impl TimeUnit {
    pub fn parse(s: &str) -> Option<TimeUnit> {
        match s.trim().to_lowercase().as_str() {
            "beats" | "beat" => Some(TimeUnit::Beats),
            "seconds" | "second" | "secs" => Some(TimeUnit::Seconds),
            _ => None,
        }
    }
}

/// Read SMF bytes into a signal stream.
///
/// Tracks are merged by absolute tick; ties keep track order. Channels are
/// not separated. A note-on with velocity 0 is an offset.
pub fn signals_from_smf(bytes: &[u8], unit: TimeUnit) -> Result<Vec<Signal>> {
    let smf = Smf::parse(bytes).map_err(|e| Error::MidiParse(e.to_string()))?;

    let ppq = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        Timing::Timecode(_, _) => TIMECODE_FALLBACK_PPQ,
    }
    .max(1);

    // (absolute tick, track index, kind); meta events other than tempo become Other
    let mut merged: Vec<(u64, usize, Merged)> = Vec::new();
    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut tick: u64 = 0;
        for event in track {
            tick += event.delta.as_int() as u64;
            merged.push((tick, track_index, Merged::from_kind(&event.kind)));
        }
    }
    merged.sort_by_key(|(tick, track, _)| (*tick, *track));

    debug!(
        tracks = smf.tracks.len(),
        events = merged.len(),
        ppq,
        "flattening SMF"
    );

    let mut signals = Vec::with_capacity(merged.len());
    let mut tempo = DEFAULT_TEMPO_USEC;
    let mut last_tick: u64 = 0;
    let mut elapsed = 0.0;
    let mut last_time = 0.0;

    for (tick, _, event) in merged {
        let span = (tick - last_tick) as f64 / ppq as f64;
        elapsed += match unit {
            TimeUnit::Beats => span,
            TimeUnit::Seconds => span * tempo as f64 / 1_000_000.0,
        };
        last_tick = tick;

        let delta = elapsed - last_time;
        last_time = elapsed;

        let kind = match event {
            Merged::Signal(kind) => kind,
            Merged::Tempo(usec) => {
                tempo = usec;
                SignalKind::Other
            }
        };
        signals.push(Signal { delta, kind });
    }

    Ok(signals)
}

enum Merged {
    Signal(SignalKind),
    Tempo(u32),
}

impl Merged {
    fn from_kind(kind: &TrackEventKind) -> Merged {
        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(usec)) => Merged::Tempo(usec.as_int()),
            TrackEventKind::Midi { message, .. } => Merged::Signal(match *message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => SignalKind::Onset {
                    pitch: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    SignalKind::Offset {
                        pitch: key.as_int(),
                    }
                }
                MidiMessage::ProgramChange { program } => SignalKind::ProgramChange {
                    program: program.as_int(),
                },
                _ => SignalKind::Other,
            }),
            _ => Merged::Signal(SignalKind::Other),
        }
    }
}

/// Options for writing a timeline as SMF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmfOptions {
    pub ticks_per_beat: u16,
    pub bpm: f64,
    pub channel: u8,
}

impl Default for SmfOptions {
    fn default() -> Self {
        Self {
            ticks_per_beat: 480,
            bpm: 120.0,
            channel: 0,
        }
    }
}

/// Largest tick a variable-length delta can reach from zero.
const MAX_TICK: u64 = 0x0FFF_FFFF;

/// Absolute tick for a time in beats. Times past [`MAX_TICK`] are an
/// error rather than a silently truncated delta.
fn to_tick(index: usize, field: &str, beats: f64, tpb: u16) -> Result<u64> {
    if !beats.is_finite() {
        return Err(Error::MidiWrite(format!("note {index}: {field} {beats} is not a finite time")));
    }
    let tick = (beats.max(0.0) * tpb as f64).round();
    if tick > MAX_TICK as f64 {
        return Err(Error::MidiWrite(format!(
            "note {index}: {field} at beat {beats} is past the last writable tick {MAX_TICK}"
        )));
    }
    Ok(tick as u64)
}

/// Write a timeline as a single-track SMF.
///
/// Note times are beats. Every note lasts at least one tick, and offsets
/// sort before onsets on the same tick so repeated pitches re-articulate.
pub fn timeline_to_smf(timeline: &Timeline, options: &SmfOptions) -> Result<Vec<u8>> {
    if options.channel > 15 {
        return Err(Error::MidiWrite(format!(
            "channel {} out of range 0-15",
            options.channel
        )));
    }
    if !(options.bpm.is_finite() && options.bpm > 0.0) {
        return Err(Error::MidiWrite(format!("invalid bpm {}", options.bpm)));
    }

    let tpb = options.ticks_per_beat.max(1);
    let channel = options.channel;

    // (tick, is_onset, message); false sorts first
    let mut timed: Vec<(u64, bool, MidiMessage)> = Vec::with_capacity(timeline.events.len() * 2);
    for (index, note) in timeline.events.iter().enumerate() {
        if note.pitch > 127 {
            return Err(Error::InvalidField {
                index,
                field: "pitch",
                value: note.pitch as f64,
            });
        }
        if note.velocity > 127 {
            return Err(Error::InvalidField {
                index,
                field: "velocity",
                value: note.velocity as f64,
            });
        }

        let on = to_tick(index, "start", note.start, tpb)?;
        let off = to_tick(index, "end", note.end(), tpb)?.max(on + 1);
        if off > MAX_TICK {
            return Err(Error::MidiWrite(format!(
                "note {index}: end tick {off} is past the last writable tick {MAX_TICK}"
            )));
        }
        timed.push((
            on,
            true,
            MidiMessage::NoteOn {
                key: note.pitch.into(),
                vel: note.velocity.max(1).into(),
            },
        ));
        timed.push((
            off,
            false,
            MidiMessage::NoteOff {
                key: note.pitch.into(),
                vel: 0.into(),
            },
        ));
    }
    timed.sort_by_key(|(tick, is_onset, _)| (*tick, *is_onset));

    let usec = (60_000_000.0 / options.bpm).round() as u32;
    let mut track: Vec<TrackEvent<'static>> = vec![TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(usec.into())),
    }];

    if let Some(program) = timeline.instrument_program {
        track.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::ProgramChange {
                    program: program.min(127).into(),
                },
            },
        });
    }

    let mut last_tick = 0u64;
    for (tick, _, message) in timed {
        // ticks are bounded by MAX_TICK, so every delta fits a u28
        let delta = (tick - last_tick) as u32;
        track.push(TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Midi {
                channel: channel.into(),
                message,
            },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header::new(Format::SingleTrack, Timing::Metrical(tpb.into())),
        tracks: vec![track],
    };

    let mut buffer = Vec::new();
    smf.write(&mut buffer)
        .map_err(|e| Error::MidiWrite(e.to_string()))?;
    Ok(buffer)
}
