//! User configuration
//!
//! Read from a TOML file next to the binary. A missing file is replaced with
//! the commented default; a broken file falls back to defaults with a warning
//! so the client still runs.

use log::{info, warn};
use serde::Deserialize;
use std::path::Path;

use crate::domain::ConfigError;

pub const DEFAULT_HOST: &str = "https://ddstats.com";

/// Which sessions a channel accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelFilter {
    pub stats: bool,
    pub replay_stats: bool,
    pub non_default_spawnsets: bool,
}

impl Default for ChannelFilter {
    fn default() -> Self {
        Self { stats: true, replay_stats: true, non_default_spawnsets: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    #[serde(alias = "notify_above_1100")]
    pub notify_above_1000: bool,
    pub notify_player_best: bool,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self { notify_above_1000: true, notify_player_best: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub get_motd: bool,
    pub check_for_updates: bool,
    pub offline_mode: bool,
    pub auto_clipboard_game: bool,
    pub host: String,
    pub stream: ChannelFilter,
    pub submit: ChannelFilter,
    pub discord: DiscordConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            get_motd: true,
            check_for_updates: true,
            offline_mode: false,
            auto_clipboard_game: false,
            host: DEFAULT_HOST.to_string(),
            stream: ChannelFilter::default(),
            submit: ChannelFilter { non_default_spawnsets: false, ..ChannelFilter::default() },
            discord: DiscordConfig::default(),
        }
    }
}

/// Result of [`load`]: the config in effect plus any problem worth showing
#[derive(Debug, Clone)]
pub struct Loaded {
    pub config: Config,
    pub warning: Option<String>,
}

/// Parse config text
///
/// # Errors
/// Returns [`ConfigError::Parse`] for malformed TOML or wrongly typed fields.
pub fn parse(text: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Load the config at `path`, never failing
///
/// Missing: defaults are used and the default file is written.
/// Unreadable or malformed: defaults are used and a warning is returned.
pub fn load(path: &Path) -> Loaded {
    match std::fs::read_to_string(path) {
        Ok(text) => match parse(&text) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                Loaded { config, warning: None }
            }
            Err(e) => {
                warn!("{}: {e}; using defaults", path.display());
                Loaded {
                    config: Config::default(),
                    warning: Some(format!("Config error, using defaults (F12 rewrites): {e}")),
                }
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if let Err(e) = write_default(path) {
                warn!("Could not write default config to {}: {e}", path.display());
            } else {
                info!("Wrote default config to {}", path.display());
            }
            Loaded { config: Config::default(), warning: None }
        }
        Err(e) => {
            warn!("Could not read {}: {e}; using defaults", path.display());
            Loaded { config: Config::default(), warning: Some(format!("Config unreadable: {e}")) }
        }
    }
}

/// Overwrite `path` with the commented default config
///
/// # Errors
/// Returns [`ConfigError::Io`] if the file cannot be written.
pub fn write_default(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, DEFAULT_CONFIG)?;
    Ok(())
}

pub const DEFAULT_CONFIG: &str = r#"# ddstats configuration
# Press F12 while ddstats is running to rewrite this file with the defaults.

# "get_motd" fetches the message of the day on startup.
# "check_for_updates" asks the server whether a newer client is available.
# "offline_mode" disables all networking; [stream] and [submit] are ignored.
# "auto_clipboard_game" copies the link to each submitted game to the clipboard.
# "host" is the server to talk to.
get_motd = true
check_for_updates = true
offline_mode = false
auto_clipboard_game = false
host = "https://ddstats.com"

# Whether live stats are streamed while you play.
# "stats" normal runs, "replay_stats" replays you watch,
# "non_default_spawnsets" runs on a custom spawnset.
[stream]
stats = true
replay_stats = true
non_default_spawnsets = true

# Whether finished games are submitted. Same keys as [stream].
[submit]
stats = true
replay_stats = true
non_default_spawnsets = false

# Discord bot notifications for your games.
[discord]
notify_above_1000 = true
notify_player_best = true
"#;
