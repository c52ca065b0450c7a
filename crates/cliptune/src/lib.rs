//! cliptune - notation bridge between clips and a generation model
//!
//! The binary wires the `timeline`, `abc` and `clipconf` crates into
//! subcommands; the library half holds the session model used to build
//! prompts.

pub mod session;

pub use session::{
    generation_prompt, generation_prompt_with, Clip, ContextOptions, Session, SessionError, Track,
    SYSTEM_PROMPT,
};
