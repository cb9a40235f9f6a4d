//! Engine configuration

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::worker::EatPause;

/// How savages share the pot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Plain producer/consumer handshake, no per-savage fairness
    #[default]
    Baseline,
    /// Every savage eats once per round before anyone eats twice
    Fair,
}

impl Policy {
    pub fn from_fair(fair: bool) -> Self {
        if fair { Policy::Fair } else { Policy::Baseline }
    }

    pub fn is_fair(&self) -> bool {
        matches!(self, Policy::Fair)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Baseline => write!(f, "baseline"),
            Policy::Fair => write!(f, "fair"),
        }
    }
}

/// How long an engine run lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Every savage eats once, then the run ends
    SingleShot,
    /// Every savage eats this many times, then the run ends
    Bites(u64),
    /// Everyone eats freely for this long, then the run is cancelled
    Timed(Duration),
}

impl RunMode {
    /// Per-savage bite quota, `None` for open-ended runs
    pub fn quota(&self) -> Option<u64> {
        match self {
            RunMode::SingleShot => Some(1),
            RunMode::Bites(n) => Some(*n),
            RunMode::Timed(_) => None,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::SingleShot => write!(f, "single-shot"),
            RunMode::Bites(n) => write!(f, "{} bites each", n),
            RunMode::Timed(d) => write!(f, "timed {:?}", d),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Servings in a full pot
    pub capacity: usize,

    /// Number of savages (ids 1..=savages)
    pub savages: usize,

    pub policy: Policy,

    /// Pause between two meals of the same savage
    pub pause: EatPause,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            savages: 7,
            policy: Policy::Baseline,
            pause: EatPause::new(Duration::from_millis(10), Duration::ZERO),
        }
    }
}

impl EngineConfig {
    pub fn new(capacity: usize, savages: usize, policy: Policy) -> Self {
        Self {
            capacity,
            savages,
            policy,
            ..Default::default()
        }
    }

    pub fn with_pause(mut self, pause: EatPause) -> Self {
        self.pause = pause;
        self
    }

    /// Check the engine can be built from this configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.capacity == 0 {
            return Err(EngineError::invalid("pot capacity must be positive"));
        }
        if self.savages == 0 {
            return Err(EngineError::invalid("at least one savage is required"));
        }
        Ok(())
    }
}
