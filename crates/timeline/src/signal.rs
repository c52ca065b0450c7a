use serde::{Deserialize, Serialize};

/// What a signal does once the clock has advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    Onset { pitch: u8, velocity: u8 },
    Offset { pitch: u8 },
    ProgramChange { program: u8 },
    /// Anything else in the stream. Only its delta matters.
    Other,
}

/// One entry of the chronological input stream.
///
/// `delta` is the time since the previous signal, in whatever unit the
/// producer chose (beats for clip injection).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub delta: f64,
    pub kind: SignalKind,
}

impl Signal {
    pub fn onset(delta: f64, pitch: u8, velocity: u8) -> Self {
        Self {
            delta,
            kind: SignalKind::Onset { pitch, velocity },
        }
    }

    pub fn offset(delta: f64, pitch: u8) -> Self {
        Self {
            delta,
            kind: SignalKind::Offset { pitch },
        }
    }

    pub fn program_change(delta: f64, program: u8) -> Self {
        Self {
            delta,
            kind: SignalKind::ProgramChange { program },
        }
    }

    pub fn other(delta: f64) -> Self {
        Self {
            delta,
            kind: SignalKind::Other,
        }
    }
}
