//! Session snapshot and generation prompt text.
//!
//! A session is what the host reports about the set: tempo, tracks, and
//! the clips on each track with their flat note lists. The context block
//! renders every clip through the prompt notation so a model sees the
//! other parts before filling one in.

use abc::{encode_flat_notes_with, wrap_as_document, DocumentHeader, OctaveStyle};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Model instructions sent ahead of every generation request.
pub const SYSTEM_PROMPT: &str = "System: You generate music in ABC notation, respond with notation between ```abc blocks and no other text. You are given a current representation of a track with multiple instruments and melodies and are asked to fill in one of the melodies.\n        Set MIDI-instrument using: %%MIDI program {GM number} (after the V: block) for drums set %%MIDI channel 10. ";

const NO_NOTES: &str = "No notes given yet";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to parse session JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("track {track} out of range ({count} tracks)")]
    NoSuchTrack { track: usize, count: usize },

    #[error("clip {clip} out of range on track {track:?} ({count} clips)")]
    NoSuchClip { track: String, clip: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub bpm: f64,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub clips: Vec<Clip>,
}

/// One clip slot. `notes` is the flat transport list, five values per note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    pub index: i64,
    #[serde(default)]
    pub notes: Vec<f64>,
}

/// How clip notes are written into the context block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextOptions {
    /// Template header; the title is replaced by each track's name.
    pub header: DocumentHeader,
    pub style: OctaveStyle,
}

impl Session {
    pub fn from_json(text: &str) -> Result<Session> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn context(&self) -> String {
        self.context_with(&ContextOptions::default())
    }

    /// The "Tracks and Clips Information" block. Tracks without clips are
    /// left out.
    pub fn context_with(&self, options: &ContextOptions) -> String {
        let mut out = String::from("Tracks and Clips Information:\n");
        out.push_str(&format!("BPM: {:?}\n", self.bpm));

        for track in self.tracks.iter().filter(|t| !t.clips.is_empty()) {
            out.push_str(&format!("Track: {}\n", track.name));
            for clip in &track.clips {
                out.push_str(&format!(
                    "  - Clip Name: {}, Index: {}, Notes: [{}]\n",
                    clip.name,
                    clip.index,
                    clip_notation(track, clip, options)
                ));
            }
        }

        out
    }

    /// Resolve track and clip positions to their names.
    pub fn names(&self, track: usize, clip: usize) -> Result<(&str, &str)> {
        let t = self.tracks.get(track).ok_or(SessionError::NoSuchTrack {
            track,
            count: self.tracks.len(),
        })?;
        let c = t.clips.get(clip).ok_or_else(|| SessionError::NoSuchClip {
            track: t.name.clone(),
            clip,
            count: t.clips.len(),
        })?;
        Ok((&t.name, &c.name))
    }
}

fn clip_notation(track: &Track, clip: &Clip, options: &ContextOptions) -> String {
    if clip.notes.is_empty() {
        return NO_NOTES.to_string();
    }

    match encode_flat_notes_with(&clip.notes, options.style) {
        Ok(body) if !body.is_empty() => {
            let header = DocumentHeader {
                title: track.name.clone(),
                ..options.header.clone()
            };
            wrap_as_document(body.as_str(), &header)
        }
        Ok(_) => NO_NOTES.to_string(),
        Err(e) => {
            warn!(track = %track.name, clip = %clip.name, error = %e, "clip notes not encodable");
            NO_NOTES.to_string()
        }
    }
}

/// The user turn of a generation request: target names, the prompt, and
/// the session context.
pub fn generation_prompt(session: &Session, track: usize, clip: usize, prompt: &str) -> Result<String> {
    generation_prompt_with(session, track, clip, prompt, &ContextOptions::default())
}

pub fn generation_prompt_with(
    session: &Session,
    track: usize,
    clip: usize,
    prompt: &str,
    options: &ContextOptions,
) -> Result<String> {
    let (track_name, clip_name) = session.names(track, clip)?;
    Ok(format!(
        "Write ABC notation for track \"{}\" and clip \"{}\" and this prompt:\"{}\" \n \n\"{}",
        track_name,
        clip_name,
        prompt,
        session.context_with(options)
    ))
}
