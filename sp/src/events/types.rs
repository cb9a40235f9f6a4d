//! Event types for pot activity
//!
//! Every state transition of the pot produces one event:
//! - A savage finding the pot empty and calling the cook
//! - The cook refilling the pot
//! - A savage taking a serving
//! - A fairness round being reset (naturally or by a refill)

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a fairness round was reset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetKind {
    /// Every active savage had eaten this round
    Natural,
    /// The cook refilled the pot
    Forced,
}

impl fmt::Display for ResetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetKind::Natural => write!(f, "natural"),
            ResetKind::Forced => write!(f, "forced"),
        }
    }
}

/// What happened to the pot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    /// A savage found the pot empty and raised the refill request
    RefillRequested,
    /// The cook filled the pot back to capacity
    Refilled,
    /// A savage took one serving
    Bite,
    /// The "has eaten" flags were cleared and a new round began
    RoundReset { reset: ResetKind, cleared: usize },
}

/// A single pot transition, stamped while the pot lock was held
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotEvent {
    /// Position in the total order of transitions
    pub seq: u64,

    pub kind: EventKind,

    /// Savage responsible for the transition, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savage: Option<usize>,

    /// Servings left in the pot after the transition
    pub servings: usize,

    /// Fairness round after the transition (fair policy only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u64>,

    /// Number of refills performed so far
    pub generation: u64,
}

impl PotEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            EventKind::RefillRequested => "RefillRequested",
            EventKind::Refilled => "Refilled",
            EventKind::Bite => "Bite",
            EventKind::RoundReset { .. } => "RoundReset",
        }
    }

    pub fn is_bite(&self) -> bool {
        matches!(self.kind, EventKind::Bite)
    }

    /// The reset kind, if this event is a round reset
    pub fn reset_kind(&self) -> Option<ResetKind> {
        match self.kind {
            EventKind::RoundReset { reset, .. } => Some(reset),
            _ => None,
        }
    }
}

impl fmt::Display for PotEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, self.savage) {
            (EventKind::Bite, Some(id)) => write!(
                f,
                "Savage {} took a serving. Pot now has {} servings.",
                id, self.servings
            ),
            (EventKind::RefillRequested, Some(id)) => {
                write!(f, "Savage {} found the pot empty and woke the cook.", id)
            }
            (EventKind::Refilled, _) => write!(
                f,
                "Cook refilled the pot. Pot now has {} servings. Generation: {}",
                self.servings, self.generation
            ),
            (EventKind::RoundReset { reset, cleared }, savage) => {
                write!(f, "Round {} begins ({} reset", self.round.unwrap_or_default(), reset)?;
                if let Some(id) = savage {
                    write!(f, " by savage {}", id)?;
                }
                write!(f, ", {} flags cleared).", cleared)
            }
            (kind, None) => write!(f, "{:?}. Pot now has {} servings.", kind, self.servings),
        }
    }
}

/// A timestamped event log entry for file persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Timestamp of the event
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,

    /// The event
    pub event: PotEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: PotEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
