//! Configuration module for lurk-server.
//!
//! Handles loading configuration from a TOML file and applying CLI
//! overrides on top of it.

pub mod file;
pub mod runtime;

use crate::config::file::{FileConfig, RosterEntry};
use crate::config::runtime::{RosterRacer, SessionConfig};
use lurk_sdk::objects::PACKET_SEPARATOR;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    tick_interval_override: Option<u64>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, tick_interval_override: Option<u64>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            tick_interval_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// A missing file is not an error: the race runs on defaults.
    pub fn load(&self) -> Result<SessionConfig, ConfigError> {
        match std::fs::read_to_string(&self.config_path) {
            Ok(content) => self.load_str(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults"
                );
                self.build(FileConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse, override and validate configuration text.
    pub fn load_str(&self, content: &str) -> Result<SessionConfig, ConfigError> {
        let file_config: FileConfig = toml::from_str(content)?;
        self.build(file_config)
    }

    fn build(&self, mut file_config: FileConfig) -> Result<SessionConfig, ConfigError> {
        if let Some(secs) = self.tick_interval_override {
            file_config.race.tick_interval_secs = secs;
        }

        validate(&file_config)?;

        let mut config = SessionConfig {
            tick_interval: Duration::from_secs(file_config.race.tick_interval_secs),
            points_per_tick: i64::from(file_config.race.points_per_tick),
            auto_register: file_config.race.auto_register,
            avatar_template: file_config.race.avatar_template,
            output: file_config.output.format,
            roster: Vec::new(),
        };
        let roster = file_config
            .racers
            .into_iter()
            .map(|entry| resolve_roster_entry(&config, entry))
            .collect();
        config.roster = roster;
        Ok(config)
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.race.tick_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "race.tick_interval_secs must be greater than 0".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in &config.racers {
        let name = entry.name.trim();
        if name.is_empty() {
            return Err(ConfigError::ValidationError(
                "racer name must not be empty".to_string(),
            ));
        }
        if name.contains(PACKET_SEPARATOR) {
            return Err(ConfigError::ValidationError(format!(
                "racer name {name:?} contains the packet separator {PACKET_SEPARATOR:?}"
            )));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::ValidationError(format!(
                "racer {name:?} is listed more than once"
            )));
        }
    }
    Ok(())
}

fn resolve_roster_entry(config: &SessionConfig, entry: RosterEntry) -> RosterRacer {
    let name = entry.name.trim().to_string();
    let avatar = entry.avatar.unwrap_or_else(|| config.avatar_for(&name));
    RosterRacer { name, avatar }
}
