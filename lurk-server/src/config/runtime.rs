//! Validated configuration the session runs with.

use super::file::OutputFormat;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub tick_interval: Duration,
    pub points_per_tick: i64,
    pub auto_register: bool,
    pub avatar_template: String,
    pub output: OutputFormat,
    pub roster: Vec<RosterRacer>,
}

/// A roster entry with its avatar resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRacer {
    pub name: String,
    pub avatar: String,
}

impl SessionConfig {
    /// Avatar URL for a racer registered without one.
    pub fn avatar_for(&self, name: &str) -> String {
        self.avatar_template.replace("{name}", name)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            points_per_tick: 1,
            auto_register: true,
            avatar_template: "https://avatars.example/{name}.png".to_string(),
            output: OutputFormat::Line,
            roster: Vec::new(),
        }
    }
}
