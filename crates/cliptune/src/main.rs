//! cliptune - MIDI clips to ABC prompts and back
//!
//! Subcommands:
//! - `cliptune encode <file.mid>` - Reconstruct notes and print prompt notation
//! - `cliptune decode <file.abc>` - Print the timeline as JSON, optionally as SMF
//! - `cliptune plan <file>` - Print the clip insertion commands
//! - `cliptune extract <response.txt>` - Pull notation out of a model reply
//! - `cliptune prompt <session.json>` - Build a generation request
//! - `cliptune config` - Show the effective configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clipconf::ClipConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "cliptune")]
#[command(about = "Translate clips between MIDI and ABC notation")]
#[command(version)]
struct Cli {
    /// Config file used in place of ./cliptune.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a Standard MIDI File as prompt notation
    Encode {
        /// Input .mid file
        file: PathBuf,

        /// Document title (T:)
        #[arg(long)]
        title: Option<String>,

        /// Document key (K:)
        #[arg(long)]
        key: Option<String>,

        /// Use the older lowercase octave spelling
        #[arg(long)]
        legacy_octaves: bool,

        /// Print the note body without header or repeat bars
        #[arg(long, conflicts_with = "exact")]
        body_only: bool,

        /// Print standard ABC that decodes back to the same notes
        #[arg(long)]
        exact: bool,
    },

    /// Decode ABC notation into a timeline
    Decode {
        /// Input notation file
        file: PathBuf,

        /// Play repeated sections twice
        #[arg(long)]
        expand_repeats: bool,

        /// Velocity for every decoded note (0-127)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=127))]
        velocity: Option<u8>,

        /// Also write the timeline as a Standard MIDI File
        #[arg(long)]
        midi: Option<PathBuf>,
    },

    /// Print the clip insertion plan for a notation or MIDI file
    Plan {
        /// Input .abc or .mid file
        file: PathBuf,

        /// Track index
        #[arg(short, long, default_value = "0")]
        track: u32,

        /// Clip slot index
        #[arg(short, long, default_value = "0")]
        slot: u32,
    },

    /// Extract notation from a model response
    Extract {
        /// Response text file
        file: PathBuf,
    },

    /// Build a generation request from a session snapshot
    Prompt {
        /// Session JSON file
        file: PathBuf,

        /// Track position in the session
        #[arg(short, long)]
        track: usize,

        /// Clip position on the track
        #[arg(short, long)]
        clip: usize,

        /// What to ask for
        #[arg(short, long)]
        prompt: String,

        /// Print the system prompt first
        #[arg(long)]
        system: bool,
    },

    /// Show the effective configuration as TOML
    Config,
}

fn init_tracing(config: &ClipConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.telemetry.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<(ClipConfig, clipconf::ConfigSources)> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    }
    ClipConfig::load_with_sources_from(path).context("Failed to load configuration")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = load_config(cli.config.as_deref())?;
    init_tracing(&config);

    match cli.command {
        Commands::Encode {
            file,
            title,
            key,
            legacy_octaves,
            body_only,
            exact,
        } => {
            let output = if exact {
                commands::OutputForm::Exact
            } else if body_only {
                commands::OutputForm::Body
            } else {
                commands::OutputForm::Prompt
            };
            commands::encode(
                &config,
                &file,
                commands::EncodeArgs {
                    title,
                    key,
                    legacy_octaves,
                    output,
                },
            )
        }
        Commands::Decode {
            file,
            expand_repeats,
            velocity,
            midi,
        } => commands::decode(&config, &file, expand_repeats, velocity, midi.as_deref()),
        Commands::Plan { file, track, slot } => commands::plan(&config, &file, track, slot),
        Commands::Extract { file } => commands::extract(&file),
        Commands::Prompt {
            file,
            track,
            clip,
            prompt,
            system,
        } => commands::prompt(&config, &file, track, clip, &prompt, system),
        Commands::Config => commands::show_config(&config, &sources),
    }
}
