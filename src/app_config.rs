use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::captions::interval_set::{InsertPolicy, DEFAULT_PLAYHEAD_GAP_SECS, DEFAULT_SPAN_SECS};

/// Application configuration module
/// This module handles loading, validating and saving the engine settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Caption engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Persistence settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Caption insertion and timer settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    // @field: Length of a freshly appended caption
    #[serde(default = "default_span_secs")]
    pub default_span_secs: u64,

    // @field: Space left before the next caption on a playhead insert
    #[serde(default = "default_playhead_gap_secs")]
    pub playhead_gap_secs: u64,

    // @field: Loop check period
    #[serde(default = "default_loop_tick_ms")]
    pub loop_tick_ms: u64,

    // @field: Caption display refresh period
    #[serde(default = "default_display_refresh_ms")]
    pub display_refresh_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_span_secs: default_span_secs(),
            playhead_gap_secs: default_playhead_gap_secs(),
            loop_tick_ms: default_loop_tick_ms(),
            display_refresh_ms: default_display_refresh_ms(),
        }
    }
}

impl EngineConfig {
    /// Sizes handed to new caption sets
    pub fn insert_policy(&self) -> InsertPolicy {
        InsertPolicy {
            default_span_secs: self.default_span_secs,
            playhead_gap_secs: self.playhead_gap_secs,
        }
    }
}

/// Database location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DatabaseConfig {
    // @field: SQLite file; the platform data directory when unset
    #[serde(default)]
    pub path: Option<String>,
}

impl DatabaseConfig {
    pub fn path(&self) -> Option<PathBuf> {
        self.path.as_ref().map(PathBuf::from)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_span_secs() -> u64 {
    DEFAULT_SPAN_SECS
}

fn default_playhead_gap_secs() -> u64 {
    DEFAULT_PLAYHEAD_GAP_SECS
}

fn default_loop_tick_ms() -> u64 {
    1000
}

fn default_display_refresh_ms() -> u64 {
    250
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.engine.default_span_secs == 0 {
            return Err(anyhow!("engine.default_span_secs must be at least 1 second"));
        }

        // The gap must leave room for at least one second of caption
        if self.engine.playhead_gap_secs >= self.engine.default_span_secs {
            return Err(anyhow!(
                "engine.playhead_gap_secs ({}) must be smaller than engine.default_span_secs ({})",
                self.engine.playhead_gap_secs,
                self.engine.default_span_secs
            ));
        }

        if self.engine.loop_tick_ms == 0 || self.engine.display_refresh_ms == 0 {
            return Err(anyhow!("Timer periods must be greater than 0 ms"));
        }

        if let Some(path) = &self.database.path {
            if path.trim().is_empty() {
                return Err(anyhow!("database.path is set but empty"));
            }
        }

        Ok(())
    }

    /// Read a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Read the config, creating it with defaults when missing
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            Self::load(path)?
        } else {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Self::default();
            config.save(path)?;
            config
        };

        config.validate().context("Configuration validation failed")?;
        Ok(config)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            engine: EngineConfig::default(),
            database: DatabaseConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
