//! CLI command implementations

use std::fs;
use std::path::Path;

use abc::{
    encode_timeline_with, extract_notation, wrap_as_document, DecodeOptions, Document, DocumentHeader, OctaveStyle,
};
use anyhow::{anyhow, Context, Result};
use clipconf::{ClipConfig, ConfigSources};
use cliptune::{generation_prompt_with, ContextOptions, Session, SYSTEM_PROMPT};
use serde_json::json;
use timeline::{reconstruct_with, signals_from_smf, timeline_to_smf, ClipPlan, RetriggerPolicy, SmfOptions, TimeUnit, Timeline};
use tracing::{info, warn};

/// What `encode` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputForm {
    /// Header plus `|: ... :|`, spaces removed.
    Prompt,
    Body,
    /// Standard ABC at `L:1/4`.
    Exact,
}

pub struct EncodeArgs {
    pub title: Option<String>,
    pub key: Option<String>,
    pub legacy_octaves: bool,
    pub output: OutputForm,
}

fn header_from(config: &ClipConfig) -> DocumentHeader {
    DocumentHeader {
        index: 1,
        title: config.notation.title.clone(),
        meter: config.notation.meter.clone(),
        default_length: config.notation.default_length.clone(),
        key: config.notation.key.clone(),
    }
}

fn octave_style(legacy: bool) -> OctaveStyle {
    if legacy {
        OctaveStyle::Legacy
    } else {
        OctaveStyle::Canonical
    }
}

fn is_midi(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"))
}

/// Read an SMF and rebuild its notes with the configured policy and unit.
fn timeline_from_midi(config: &ClipConfig, path: &Path) -> Result<Timeline> {
    let unit = TimeUnit::parse(&config.reconstruct.time_unit)
        .ok_or_else(|| anyhow!("Unknown time unit '{}' (expected beats or seconds)", config.reconstruct.time_unit))?;
    let policy = RetriggerPolicy::parse(&config.reconstruct.retrigger).ok_or_else(|| {
        anyhow!(
            "Unknown retrigger policy '{}' (expected replace, close_and_restart, stack or reject)",
            config.reconstruct.retrigger
        )
    })?;

    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let signals = signals_from_smf(&bytes, unit).with_context(|| format!("Failed to parse {}", path.display()))?;
    let timeline = reconstruct_with(signals, policy).with_context(|| format!("Failed to reconstruct {}", path.display()))?;

    info!(
        notes = timeline.events.len(),
        length = timeline.total_length,
        program = ?timeline.instrument_program,
        "reconstructed clip"
    );
    Ok(timeline)
}

/// Read notation and decode it, logging anything the decoder skipped.
fn timeline_from_abc(path: &Path, options: &DecodeOptions) -> Result<(Timeline, Option<f64>)> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let decoded = abc::decode(&text, options).with_context(|| format!("Failed to decode {}", path.display()))?;

    for feedback in &decoded.feedback {
        warn!(line = feedback.line, column = feedback.column, "{}", feedback.message);
    }
    info!(
        title = %decoded.title,
        notes = decoded.timeline.events.len(),
        length = decoded.timeline.total_length,
        "decoded notation"
    );
    Ok((decoded.timeline, decoded.bpm))
}

fn decode_options(config: &ClipConfig, expand_repeats: bool, velocity: Option<u8>) -> DecodeOptions {
    DecodeOptions {
        velocity: velocity.unwrap_or(config.decode.velocity),
        expand_repeats: expand_repeats || config.decode.expand_repeats,
    }
}

/// MIDI file to notation
pub fn encode(config: &ClipConfig, path: &Path, args: EncodeArgs) -> Result<()> {
    let timeline = timeline_from_midi(config, path)?;

    let mut header = header_from(config);
    if let Some(title) = args.title {
        header.title = title;
    }
    if let Some(key) = args.key {
        header.key = key;
    }

    match args.output {
        OutputForm::Exact => {
            let text = Document::new(header, &timeline).render()?;
            print!("{}", text);
        }
        OutputForm::Body | OutputForm::Prompt => {
            let style = octave_style(args.legacy_octaves || config.notation.legacy_octaves);
            let body = encode_timeline_with(&timeline.events, style)?;
            if args.output == OutputForm::Body {
                println!("{}", body);
            } else {
                println!("{}", wrap_as_document(body.as_str(), &header));
            }
        }
    }

    Ok(())
}

/// Notation to timeline JSON, and optionally an SMF
pub fn decode(
    config: &ClipConfig,
    path: &Path,
    expand_repeats: bool,
    velocity: Option<u8>,
    midi: Option<&Path>,
) -> Result<()> {
    let options = decode_options(config, expand_repeats, velocity);
    let (timeline, bpm) = timeline_from_abc(path, &options)?;

    println!("{}", serde_json::to_string_pretty(&timeline)?);

    if let Some(out) = midi {
        let options = SmfOptions {
            ticks_per_beat: config.render.ticks_per_beat,
            bpm: bpm.unwrap_or(config.render.bpm),
            channel: config.render.channel,
        };
        let bytes = timeline_to_smf(&timeline, &options)?;
        fs::write(out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
        info!(path = %out.display(), bytes = bytes.len(), bpm = options.bpm, "wrote MIDI file");
    }

    Ok(())
}

/// Clip insertion commands for a notation or MIDI file
pub fn plan(config: &ClipConfig, path: &Path, track: u32, slot: u32) -> Result<()> {
    let timeline = if is_midi(path) {
        timeline_from_midi(config, path)?
    } else {
        let options = decode_options(config, false, None);
        timeline_from_abc(path, &options)?.0
    };

    let plan = ClipPlan::for_timeline(track, slot, &timeline);
    let commands: Vec<_> = plan
        .commands
        .iter()
        .map(|c| json!({ "address": c.address(), "args": c.args() }))
        .collect();

    let output = json!({
        "track": plan.track,
        "slot": plan.slot,
        "notes": plan.note_count(),
        "commands": commands,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Notation from a model reply
pub fn extract(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    println!("{}", extract_notation(&text));
    Ok(())
}

/// Generation request for one clip of a session
pub fn prompt(config: &ClipConfig, path: &Path, track: usize, clip: usize, text: &str, system: bool) -> Result<()> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let session = Session::from_json(&json).with_context(|| format!("Failed to load session {}", path.display()))?;

    let options = ContextOptions {
        header: header_from(config),
        style: octave_style(config.notation.legacy_octaves),
    };
    let request = generation_prompt_with(&session, track, clip, text, &options)?;

    if system {
        println!("{}\n", SYSTEM_PROMPT);
    }
    print!("{}", request);
    Ok(())
}

/// Effective configuration, with its sources as comments
pub fn show_config(config: &ClipConfig, sources: &ConfigSources) -> Result<()> {
    for file in &sources.files {
        println!("# file: {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# env: {}", var);
    }
    print!("{}", config.to_toml());
    Ok(())
}
