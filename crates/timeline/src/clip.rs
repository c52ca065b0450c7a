//! Clip insertion plan.
//!
//! The ordered control-surface calls that place one timeline into a
//! track/slot. Only data: a transport sends them.

use serde::{Deserialize, Serialize};

use crate::note::Timeline;

/// One argument of a control call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClipArg {
    Int(i64),
    Float(f64),
}

/// A single control-surface call addressed to a clip slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClipCommand {
    RemoveNotes {
        track: u32,
        slot: u32,
    },
    CreateClip {
        track: u32,
        slot: u32,
        length: u32,
    },
    AddNote {
        track: u32,
        slot: u32,
        pitch: u8,
        start: f64,
        duration: f64,
        velocity: u8,
        mute: bool,
    },
    SetLooping {
        track: u32,
        slot: u32,
        enabled: bool,
    },
    SetLoopStart {
        track: u32,
        slot: u32,
        beat: u32,
    },
    SetLoopEnd {
        track: u32,
        slot: u32,
        beat: u32,
    },
}

impl ClipCommand {
    pub fn address(&self) -> &'static str {
        match self {
            ClipCommand::RemoveNotes { .. } => "/live/clip/remove/notes",
            ClipCommand::CreateClip { .. } => "/live/clip/create",
            ClipCommand::AddNote { .. } => "/live/clip/add/notes",
            ClipCommand::SetLooping { .. } => "/live/clip/set/looping",
            ClipCommand::SetLoopStart { .. } => "/live/clip/set/loop_start",
            ClipCommand::SetLoopEnd { .. } => "/live/clip/set/loop_end",
        }
    }

    /// Positional arguments, track and slot first.
    pub fn args(&self) -> Vec<ClipArg> {
        use ClipArg::{Float, Int};

        match *self {
            ClipCommand::RemoveNotes { track, slot } => vec![Int(track.into()), Int(slot.into())],
            ClipCommand::CreateClip {
                track,
                slot,
                length,
            } => vec![Int(track.into()), Int(slot.into()), Int(length.into())],
            ClipCommand::AddNote {
                track,
                slot,
                pitch,
                start,
                duration,
                velocity,
                mute,
            } => vec![
                Int(track.into()),
                Int(slot.into()),
                Int(pitch.into()),
                Float(start),
                Float(duration),
                Int(velocity.into()),
                Int(mute.into()),
            ],
            ClipCommand::SetLooping {
                track,
                slot,
                enabled,
            } => vec![Int(track.into()), Int(slot.into()), Int(enabled.into())],
            ClipCommand::SetLoopStart { track, slot, beat }
            | ClipCommand::SetLoopEnd { track, slot, beat } => {
                vec![Int(track.into()), Int(slot.into()), Int(beat.into())]
            }
        }
    }
}

/// Every command needed to replace a clip's contents with a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipPlan {
    pub track: u32,
    pub slot: u32,
    pub commands: Vec<ClipCommand>,
}

impl ClipPlan {
    /// Clear, create at the timeline length, add notes, then set the loop
    /// region. Looping is switched on to move the loop points and off again
    /// afterwards.
    pub fn for_timeline(track: u32, slot: u32, timeline: &Timeline) -> ClipPlan {
        let length = timeline.total_length;
        let mut commands = Vec::with_capacity(timeline.events.len() + 6);

        commands.push(ClipCommand::RemoveNotes { track, slot });
        commands.push(ClipCommand::CreateClip {
            track,
            slot,
            length,
        });
        commands.extend(timeline.events.iter().map(|note| ClipCommand::AddNote {
            track,
            slot,
            pitch: note.pitch,
            start: note.start,
            duration: note.duration,
            velocity: note.velocity,
            mute: false,
        }));
        commands.push(ClipCommand::SetLooping {
            track,
            slot,
            enabled: true,
        });
        commands.push(ClipCommand::SetLoopStart {
            track,
            slot,
            beat: 0,
        });
        commands.push(ClipCommand::SetLoopEnd {
            track,
            slot,
            beat: length,
        });
        commands.push(ClipCommand::SetLooping {
            track,
            slot,
            enabled: false,
        });

        ClipPlan {
            track,
            slot,
            commands,
        }
    }

    pub fn note_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, ClipCommand::AddNote { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteEvent;
    use pretty_assertions::assert_eq;

    fn two_notes() -> Timeline {
        Timeline {
            events: vec![
                NoteEvent::new(60, 100, 0.0, 2.0),
                NoteEvent::new(62, 90, 1.0, 2.0),
            ],
            total_length: 2,
            instrument_program: None,
        }
    }

    #[test]
    fn test_plan_order() {
        let plan = ClipPlan::for_timeline(1, 3, &two_notes());
        let addresses: Vec<_> = plan.commands.iter().map(ClipCommand::address).collect();
        assert_eq!(
            addresses,
            vec![
                "/live/clip/remove/notes",
                "/live/clip/create",
                "/live/clip/add/notes",
                "/live/clip/add/notes",
                "/live/clip/set/looping",
                "/live/clip/set/loop_start",
                "/live/clip/set/loop_end",
                "/live/clip/set/looping",
            ]
        );
        assert_eq!(plan.note_count(), 2);
    }

    #[test]
    fn test_plan_args() {
        use ClipArg::{Float, Int};

        let plan = ClipPlan::for_timeline(1, 3, &two_notes());
        assert_eq!(plan.commands[1].args(), vec![Int(1), Int(3), Int(2)]);
        assert_eq!(
            plan.commands[3].args(),
            vec![Int(1), Int(3), Int(62), Float(1.0), Float(2.0), Int(90), Int(0)]
        );
        assert_eq!(plan.commands[4].args(), vec![Int(1), Int(3), Int(1)]);
        assert_eq!(plan.commands[6].args(), vec![Int(1), Int(3), Int(2)]);
        assert_eq!(plan.commands[7].args(), vec![Int(1), Int(3), Int(0)]);
    }

    #[test]
    fn test_empty_timeline_still_creates_clip() {
        let plan = ClipPlan::for_timeline(0, 0, &Timeline::default());
        assert_eq!(plan.commands.len(), 6);
        assert_eq!(plan.note_count(), 0);
        assert_eq!(
            plan.commands[1],
            ClipCommand::CreateClip {
                track: 0,
                slot: 0,
                length: 0
            }
        );
    }

    #[test]
    fn test_command_serializes_tagged() {
        let json = serde_json::to_value(ClipCommand::RemoveNotes { track: 2, slot: 5 }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"command": "remove_notes", "track": 2, "slot": 5})
        );

        let args = serde_json::to_value(ClipCommand::SetLoopEnd { track: 0, slot: 1, beat: 8 }.args())
            .unwrap();
        assert_eq!(args, serde_json::json!([0, 1, 8]));
    }
}
