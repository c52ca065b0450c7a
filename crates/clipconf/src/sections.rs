//! Config sections. Every field has a default so partial files work.

use serde::{Deserialize, Serialize};

/// Prompt document header and octave spelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotationConfig {
    /// Default: "Melody Example"
    #[serde(default = "NotationConfig::default_title")]
    pub title: String,

    /// Default: "4/4"
    #[serde(default = "NotationConfig::default_meter")]
    pub meter: String,

    /// Default: "1/8"
    #[serde(default = "NotationConfig::default_length")]
    pub default_length: String,

    /// Default: "Emin"
    #[serde(default = "NotationConfig::default_key")]
    pub key: String,

    /// Spell octaves the way older prompts did (60 and 72 both `c`).
    #[serde(default)]
    pub legacy_octaves: bool,
}

impl NotationConfig {
    fn default_title() -> String {
        "Melody Example".to_string()
    }

    fn default_meter() -> String {
        "4/4".to_string()
    }

    fn default_length() -> String {
        "1/8".to_string()
    }

    fn default_key() -> String {
        "Emin".to_string()
    }
}

impl Default for NotationConfig {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            meter: Self::default_meter(),
            default_length: Self::default_length(),
            key: Self::default_key(),
            legacy_octaves: false,
        }
    }
}

/// Signal stream to timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructConfig {
    /// replace, close_and_restart, stack, or reject.
    /// Default: "close_and_restart"
    #[serde(default = "ReconstructConfig::default_retrigger")]
    pub retrigger: String,

    /// beats or seconds.
    /// Default: "beats"
    #[serde(default = "ReconstructConfig::default_time_unit")]
    pub time_unit: String,
}

impl ReconstructConfig {
    fn default_retrigger() -> String {
        "close_and_restart".to_string()
    }

    fn default_time_unit() -> String {
        "beats".to_string()
    }
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            retrigger: Self::default_retrigger(),
            time_unit: Self::default_time_unit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Default: 80
    #[serde(default = "DecodeConfig::default_velocity")]
    pub velocity: u8,

    #[serde(default)]
    pub expand_repeats: bool,
}

impl DecodeConfig {
    fn default_velocity() -> u8 {
        80
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            velocity: Self::default_velocity(),
            expand_repeats: false,
        }
    }
}

/// Standard MIDI File output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Default: 480
    #[serde(default = "RenderConfig::default_ticks_per_beat")]
    pub ticks_per_beat: u16,

    /// Used when the notation has no Q: field.
    /// Default: 120
    #[serde(default = "RenderConfig::default_bpm")]
    pub bpm: f64,

    /// 0-15; 9 is General MIDI drums.
    #[serde(default)]
    pub channel: u8,
}

impl RenderConfig {
    fn default_ticks_per_beat() -> u16 {
        480
    }

    fn default_bpm() -> f64 {
        120.0
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ticks_per_beat: Self::default_ticks_per_beat(),
            bpm: Self::default_bpm(),
            channel: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Filter directive used when RUST_LOG is unset.
    /// Default: "info"
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
