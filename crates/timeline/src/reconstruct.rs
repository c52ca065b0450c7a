//! Onset/offset pairing.
//!
//! A [`Reconstructor`] owns the open-onset table and the running clock for a
//! single timeline. Build a fresh one per stream; nothing is shared between
//! instances, so separate streams can be reconstructed on separate threads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::note::{round_length, NoteEvent, Timeline};
use crate::signal::{Signal, SignalKind};

/// What to do when a pitch gets a second onset before its offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetriggerPolicy {
    /// Forget the open note and keep the new onset. The first note is lost.
    Replace,
    /// Close the open note at the re-onset time, then open the new one.
    #[default]
    CloseAndRestart,
    /// Keep both open; each offset closes the most recent onset.
    Stack,
    /// Fail the reconstruction.
    Reject,
}

impl RetriggerPolicy {
    /// Parse from a config string (case-insensitive, `-` or `_` separators).
    pub fn parse(s: &str) -> Option<RetriggerPolicy> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "replace" => Some(RetriggerPolicy::Replace),
            "close_and_restart" | "close" | "restart" => Some(RetriggerPolicy::CloseAndRestart),
            "stack" => Some(RetriggerPolicy::Stack),
            "reject" => Some(RetriggerPolicy::Reject),
            _ => None,
        }
    }
}

/// Fatal stream errors. The reconstruction that raised one is unusable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconstructError {
    #[error("offset for pitch {pitch} at t={time} has no open onset")]
    MissingOnset { pitch: u8, time: f64 },

    #[error("pitch {pitch} re-triggered at t={time} while still sounding")]
    Retrigger { pitch: u8, time: f64 },
}

#[derive(Debug, Clone, Copy)]
struct OpenOnset {
    velocity: u8,
    start: f64,
}

/// Per-timeline onset/offset state machine.
#[derive(Debug, Default)]
pub struct Reconstructor {
    policy: RetriggerPolicy,
    open: HashMap<u8, Vec<OpenOnset>>,
    events: Vec<NoteEvent>,
    clock: f64,
    last_delta: f64,
    instrument_program: Option<u8>,
}

impl Reconstructor {
    pub fn new() -> Self {
        Self::with_policy(RetriggerPolicy::default())
    }

    pub fn with_policy(policy: RetriggerPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Absolute time after the last signal pushed.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Number of onsets still waiting for an offset.
    pub fn open_onsets(&self) -> usize {
        self.open.values().map(Vec::len).sum()
    }

    /// Advance the clock by the signal's delta, then apply it.
    ///
    /// Negative or NaN deltas count as zero.
    pub fn push(&mut self, signal: Signal) -> Result<(), ReconstructError> {
        let delta = if signal.delta > 0.0 { signal.delta } else { 0.0 };
        self.clock += delta;
        self.last_delta = delta;

        match signal.kind {
            SignalKind::Onset { pitch, velocity } => self.onset(pitch, velocity),
            SignalKind::Offset { pitch } => self.offset(pitch),
            SignalKind::ProgramChange { program } => {
                self.program_change(program);
                Ok(())
            }
            SignalKind::Other => Ok(()),
        }
    }

    fn onset(&mut self, pitch: u8, velocity: u8) -> Result<(), ReconstructError> {
        let onset = OpenOnset {
            velocity,
            start: self.clock,
        };
        let stack = self.open.entry(pitch).or_default();

        if stack.is_empty() {
            stack.push(onset);
            return Ok(());
        }

        match self.policy {
            RetriggerPolicy::Replace => {
                debug!(pitch, time = self.clock, "re-onset replaces open note");
                stack.clear();
                stack.push(onset);
            }
            RetriggerPolicy::CloseAndRestart => {
                for open in stack.drain(..) {
                    self.events.push(NoteEvent {
                        pitch,
                        velocity: open.velocity,
                        start: open.start,
                        duration: self.clock - open.start,
                    });
                }
                stack.push(onset);
            }
            RetriggerPolicy::Stack => stack.push(onset),
            RetriggerPolicy::Reject => {
                return Err(ReconstructError::Retrigger {
                    pitch,
                    time: self.clock,
                });
            }
        }

        Ok(())
    }

    fn offset(&mut self, pitch: u8) -> Result<(), ReconstructError> {
        let open = self
            .open
            .get_mut(&pitch)
            .and_then(Vec::pop)
            .ok_or(ReconstructError::MissingOnset {
                pitch,
                time: self.clock,
            })?;

        if self.open.get(&pitch).is_some_and(Vec::is_empty) {
            self.open.remove(&pitch);
        }

        self.events.push(NoteEvent {
            pitch,
            velocity: open.velocity,
            start: open.start,
            duration: self.clock - open.start,
        });
        Ok(())
    }

    fn program_change(&mut self, program: u8) {
        match self.instrument_program {
            None => {
                debug!(program, "instrument program set");
                self.instrument_program = Some(program);
            }
            Some(current) => {
                debug!(program, current, "instrument program already set, ignoring");
            }
        }
    }

    /// Close the stream.
    ///
    /// The clock is rolled back by the last delta so trailing silence does
    /// not count toward the length. Onsets that never got an offset are
    /// dropped.
    pub fn finish(self) -> Timeline {
        let dangling = self.open_onsets();
        if dangling > 0 {
            warn!(dangling, "open onsets dropped at end of stream");
        }

        Timeline {
            events: self.events,
            total_length: round_length(self.clock - self.last_delta),
            instrument_program: self.instrument_program,
        }
    }
}

/// Reconstruct one timeline with the default retrigger policy.
pub fn reconstruct<I>(signals: I) -> Result<Timeline, ReconstructError>
where
    I: IntoIterator<Item = Signal>,
{
    reconstruct_with(signals, RetriggerPolicy::default())
}

/// Reconstruct one timeline with an explicit retrigger policy.
pub fn reconstruct_with<I>(signals: I, policy: RetriggerPolicy) -> Result<Timeline, ReconstructError>
where
    I: IntoIterator<Item = Signal>,
{
    let mut reconstructor = Reconstructor::with_policy(policy);
    for signal in signals {
        reconstructor.push(signal)?;
    }
    Ok(reconstructor.finish())
}
