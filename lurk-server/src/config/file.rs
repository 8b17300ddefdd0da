//! TOML file configuration structures.
//!
//! These structs directly map to the `lurk-config.toml` file format. Every
//! section is optional.

use serde::{Deserialize, Serialize};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub race: RaceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Racers registered before the first chat line arrives.
    #[serde(default)]
    pub racers: Vec<RosterEntry>,
}

/// Race rules section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Seconds between two point ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Points every in-race racer receives per tick.
    #[serde(default = "default_points_per_tick")]
    pub points_per_tick: u32,
    /// Register unknown chatters on their first command.
    #[serde(default = "default_auto_register")]
    pub auto_register: bool,
    /// Avatar URL for racers without an explicit one. `{name}` is replaced
    /// with the racer's display name.
    #[serde(default = "default_avatar_template")]
    pub avatar_template: String,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            points_per_tick: default_points_per_tick(),
            auto_register: default_auto_register(),
            avatar_template: default_avatar_template(),
        }
    }
}

fn default_tick_interval_secs() -> u64 {
    10
}

fn default_points_per_tick() -> u32 {
    1
}

fn default_auto_register() -> bool {
    true
}

fn default_avatar_template() -> String {
    "https://avatars.example/{name}.png".to_string()
}

/// Outbound rendering section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// How socket packets are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<code>,<v1>,<v2>,...`
    #[default]
    Line,
    /// `{"code":3,"values":["Alice","14"]}`
    Json,
}

/// A pre-registered racer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    /// Falls back to `race.avatar_template` when absent.
    #[serde(default)]
    pub avatar: Option<String>,
}
