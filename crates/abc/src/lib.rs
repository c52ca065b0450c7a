//! ABC notation codec for clip timelines.
//!
//! Encoding turns reconstructed notes into the compact notation used in
//! generation prompts, or into standard ABC that decodes back exactly.
//! Decoding runs a generous parser and walks the first voice back into a
//! [`timeline::Timeline`].
//!
//! # Example
//!
//! ```
//! use abc::{decode, encode_timeline, wrap_as_document, DecodeOptions, DocumentHeader};
//! use timeline::NoteEvent;
//!
//! let notes = [NoteEvent::new(60, 100, 0.0, 1.0), NoteEvent::new(64, 100, 1.0, 0.5)];
//! let body = encode_timeline(&notes).unwrap();
//! assert_eq!(body.as_str(), "C1 E/2");
//!
//! let prompt = wrap_as_document(body.as_str(), &DocumentHeader::with_title("Keys"));
//! assert!(prompt.ends_with("|:C8E2:|"));
//!
//! let decoded = decode("X:1\nL:1/4\nK:C\nC E/2|\n", &DecodeOptions::default()).unwrap();
//! assert_eq!(decoded.timeline.events.len(), 2);
//! ```

pub mod ast;
pub mod decode;
pub mod encode;
pub mod extract;
pub mod feedback;
pub mod length;
pub mod parser;
pub mod pitch;

pub use ast::*;
pub use decode::{decode, decode_tune, DecodeError, DecodeOptions, Decoded};
pub use encode::{
    encode_flat_notes, encode_flat_notes_with, encode_timeline, encode_timeline_or_empty,
    encode_timeline_with, wrap_as_document, Body, Document, DocumentHeader, EncodeError, OctaveStyle,
};
pub use extract::extract_notation;
pub use feedback::{Feedback, FeedbackLevel, ParseResult};
pub use length::DurationToken;
pub use pitch::{PitchError, PitchToken};

/// Parse ABC notation into a Tune AST.
///
/// Never fails: problems are collected as feedback and parsing carries on.
pub fn parse(input: &str) -> ParseResult<Tune> {
    parser::parse(input)
}
