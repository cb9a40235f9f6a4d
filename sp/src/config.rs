//! savagepot configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::{EngineConfig, Policy, RunMode};
use crate::events::DEFAULT_CHANNEL_CAPACITY;
use crate::worker::EatPause;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pot settings
    pub pot: PotConfig,

    /// Tribe settings
    pub savages: SavagesConfig,

    /// How long a run lasts
    pub run: RunConfig,

    /// Event echo and persistence
    pub events: EventsConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .savagepot.yml
        let local_config = PathBuf::from(".savagepot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/savagepot/savagepot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("savagepot").join("savagepot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Engine configuration described by this config
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            capacity: self.pot.capacity,
            savages: self.savages.count,
            policy: Policy::from_fair(self.pot.fair),
            pause: EatPause::new(
                Duration::from_millis(self.savages.eat_ms),
                Duration::from_millis(self.savages.jitter_ms),
            ),
        }
    }

    /// Run mode described by this config
    pub fn run_mode(&self) -> RunMode {
        match self.run.mode {
            ModeName::SingleShot => RunMode::SingleShot,
            ModeName::Bites => RunMode::Bites(self.run.bites),
            ModeName::Timed => RunMode::Timed(Duration::from_secs(self.run.duration_secs)),
        }
    }
}

/// Pot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PotConfig {
    /// Servings in a full pot
    pub capacity: usize,

    /// Enable per-round fairness
    pub fair: bool,
}

impl Default for PotConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            fair: false,
        }
    }
}

/// Tribe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SavagesConfig {
    /// Number of savages
    pub count: usize,

    /// Eating time between two meals in milliseconds
    #[serde(rename = "eat-ms")]
    pub eat_ms: u64,

    /// Random extra eating time, up to this many milliseconds
    #[serde(rename = "jitter-ms")]
    pub jitter_ms: u64,
}

impl Default for SavagesConfig {
    fn default() -> Self {
        Self {
            count: 7,
            eat_ms: 10,
            jitter_ms: 0,
        }
    }
}

/// Name of a run mode in config files and on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModeName {
    /// Every savage eats once
    #[default]
    SingleShot,
    /// Every savage eats a fixed number of times
    Bites,
    /// Run for a fixed wall-clock duration
    Timed,
}

/// Run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: ModeName,

    /// Bites per savage in `bites` mode
    pub bites: u64,

    /// Duration of a `timed` run in seconds
    #[serde(rename = "duration-secs")]
    pub duration_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: ModeName::SingleShot,
            bites: 1,
            duration_secs: 10,
        }
    }
}

/// Event echo and persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Capacity of the broadcast channel
    #[serde(rename = "channel-capacity")]
    pub channel_capacity: usize,

    /// Persist events as JSONL
    pub persist: bool,

    /// Print every event to stdout
    pub echo: bool,

    /// Directory holding one sub-directory per run
    #[serde(rename = "runs-dir")]
    pub runs_dir: PathBuf,
}

fn default_runs_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("savagepot")
        .join("runs")
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            persist: true,
            echo: true,
            runs_dir: default_runs_dir(),
        }
    }
}
