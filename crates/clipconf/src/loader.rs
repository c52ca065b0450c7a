//! Config file discovery, loading, and environment variable overlay.

use crate::{ClipConfig, ConfigError};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

const SYSTEM_CONFIG: &str = "/etc/cliptune/config.toml";
const USER_CONFIG: &str = "cliptune/config.toml";
const LOCAL_CONFIG: &str = "cliptune.toml";

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli). Only returns
/// files that exist.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from(SYSTEM_CONFIG);
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join(USER_CONFIG);
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read one file as a raw TOML table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Lay `overlay` over `base` key by key; nested tables merge, anything
/// else is replaced.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Build the typed config from a merged table; absent fields take
/// their defaults.
pub fn from_table(table: toml::Table, path: &Path) -> Result<ClipConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Apply `CLIPTUNE_*` environment variables to config.
pub fn apply_env_overrides(config: &mut ClipConfig, sources: &mut ConfigSources) {
    apply_overrides(config, sources, env::vars());
}

/// Apply overrides from any `(name, value)` source.
///
/// Values that do not parse for their field are skipped and not recorded.
pub fn apply_overrides<I>(config: &mut ClipConfig, sources: &mut ConfigSources, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(name) = key.strip_prefix("CLIPTUNE_") else {
            continue;
        };

        let applied = match name {
            "TITLE" => set(&mut config.notation.title, value),
            "METER" => set(&mut config.notation.meter, value),
            "DEFAULT_LENGTH" => set(&mut config.notation.default_length, value),
            "KEY" => set(&mut config.notation.key, value),
            "LEGACY_OCTAVES" => parse_into(&mut config.notation.legacy_octaves, &value),
            "RETRIGGER" => set(&mut config.reconstruct.retrigger, value),
            "TIME_UNIT" => set(&mut config.reconstruct.time_unit, value),
            "VELOCITY" => parse_into(&mut config.decode.velocity, &value),
            "EXPAND_REPEATS" => parse_into(&mut config.decode.expand_repeats, &value),
            "TICKS_PER_BEAT" => parse_into(&mut config.render.ticks_per_beat, &value),
            "BPM" => parse_into(&mut config.render.bpm, &value),
            "CHANNEL" => parse_into(&mut config.render.channel, &value),
            "LOG_LEVEL" => set(&mut config.telemetry.log_level, value),
            _ => false,
        };

        if applied {
            sources.env_overrides.push(key);
        }
    }
}

fn set(field: &mut String, value: String) -> bool {
    *field = value;
    true
}

fn parse_into<T: std::str::FromStr>(field: &mut T, value: &str) -> bool {
    match value.trim().parse() {
        Ok(parsed) => {
            *field = parsed;
            true
        }
        Err(_) => false,
    }
}
