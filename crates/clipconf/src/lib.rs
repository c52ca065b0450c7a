//! Layered configuration for cliptune.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, field by field):
//! 1. `/etc/cliptune/config.toml` (system)
//! 2. `~/.config/cliptune/config.toml` (user)
//! 3. `./cliptune.toml`, or the `--config` path when given
//! 4. Environment variables (`CLIPTUNE_*`)
//!
//! # Example Config
//!
//! ```toml
//! [notation]
//! title = "Melody Example"
//! meter = "4/4"
//! default_length = "1/8"
//! key = "Emin"
//! legacy_octaves = false
//!
//! [reconstruct]
//! retrigger = "close_and_restart"
//! time_unit = "beats"
//!
//! [decode]
//! velocity = 80
//! expand_repeats = false
//!
//! [render]
//! ticks_per_beat = 480
//! bpm = 120.0
//! channel = 0
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{DecodeConfig, NotationConfig, ReconstructConfig, RenderConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete cliptune configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClipConfig {
    pub notation: NotationConfig,
    pub reconstruct: ReconstructConfig,
    pub decode: DecodeConfig,
    pub render: RenderConfig,
    pub telemetry: TelemetryConfig,
}

impl ClipConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load with an explicit file in place of `./cliptune.toml`. System
    /// and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(config_path: Option<&Path>) -> Result<(Self, ConfigSources), ConfigError> {
        let files = loader::discover_config_files_with_override(config_path);
        let (mut config, mut sources) = Self::load_files(&files)?;

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Merge exactly these files, in order, with no discovery and no
    /// environment overlay.
    pub fn load_files(files: &[PathBuf]) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in files {
            let table = loader::load_table(path)?;
            // catch type errors against the file that has them
            loader::from_table(table.clone(), path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path.clone());
        }

        let origin = files.last().map_or_else(|| PathBuf::from("<defaults>"), Clone::clone);
        let config = loader::from_table(merged, &origin)?;
        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# cliptune configuration\n\n");

        output.push_str("[notation]\n");
        output.push_str(&format!("title = {:?}\n", self.notation.title));
        output.push_str(&format!("meter = {:?}\n", self.notation.meter));
        output.push_str(&format!("default_length = {:?}\n", self.notation.default_length));
        output.push_str(&format!("key = {:?}\n", self.notation.key));
        output.push_str(&format!("legacy_octaves = {}\n", self.notation.legacy_octaves));

        output.push_str("\n[reconstruct]\n");
        output.push_str(&format!("retrigger = {:?}\n", self.reconstruct.retrigger));
        output.push_str(&format!("time_unit = {:?}\n", self.reconstruct.time_unit));

        output.push_str("\n[decode]\n");
        output.push_str(&format!("velocity = {}\n", self.decode.velocity));
        output.push_str(&format!("expand_repeats = {}\n", self.decode.expand_repeats));

        output.push_str("\n[render]\n");
        output.push_str(&format!("ticks_per_beat = {}\n", self.render.ticks_per_beat));
        output.push_str(&format!("bpm = {:?}\n", self.render.bpm));
        output.push_str(&format!("channel = {}\n", self.render.channel));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = {:?}\n", self.telemetry.log_level));

        output
    }
}
