//! Note-event timelines for clip injection.
//!
//! A timeline is the universal note representation shared by the notation
//! codec and the transport layer: pitch, velocity, start and duration per
//! note, plus the clip length and the instrument program.
//!
//! ```
//! use timeline::{reconstruct, Signal};
//!
//! let signals = vec![
//!     Signal::onset(0.0, 60, 100),
//!     Signal::onset(1.0, 62, 90),
//!     Signal::offset(1.0, 60),
//!     Signal::offset(1.0, 62),
//! ];
//! let timeline = reconstruct(signals).unwrap();
//! assert_eq!(timeline.events.len(), 2);
//! assert_eq!(timeline.total_length, 2);
//! ```

pub mod clip;
pub mod note;
pub mod reconstruct;
pub mod signal;
pub mod smf;

pub use clip::{ClipArg, ClipCommand, ClipPlan};
pub use note::{NoteEvent, Timeline, FLAT_NOTE_ARITY};
pub use reconstruct::{reconstruct, reconstruct_with, ReconstructError, Reconstructor, RetriggerPolicy};
pub use signal::{Signal, SignalKind};
pub use smf::{signals_from_smf, timeline_to_smf, SmfOptions, TimeUnit};

/// Errors from timeline operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),

    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("MIDI write error: {0}")]
    MidiWrite(String),

    #[error("flat note list has {len} values, expected groups of 5")]
    FlatArity { len: usize },

    #[error("note {index}: invalid {field} value {value}")]
    InvalidField {
        index: usize,
        field: &'static str,
        value: f64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
