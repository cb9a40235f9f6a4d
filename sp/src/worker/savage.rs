//! A savage: waits for its turn and for food, then takes one serving

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::events::{EventSink, PotEvent};
use crate::pot::{Monitor, PotState};

/// Result of one evaluation of a savage's guards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavageStep {
    /// Took a serving; the pot now holds `servings`
    Ate { servings: usize },
    /// Already ate this round and the round is not over
    AwaitRound,
    /// The pot is empty; the cook has been asked
    AwaitFood,
    /// Shutdown requested
    Cancelled,
}

/// Evaluate a savage's guards once and eat if they hold
///
/// Caller holds the pot lock. Round eligibility is checked before food, so a
/// savage that ate this round never takes a serving meant for its peers.
pub fn try_eat(state: &mut PotState, savage: usize, events: &mut Vec<PotEvent>) -> SavageStep {
    if state.is_cancelled() {
        return SavageStep::Cancelled;
    }
    if !state.may_eat(savage) && !state.try_natural_reset(savage, events) {
        return SavageStep::AwaitRound;
    }
    if state.pot().is_empty() {
        state.request_refill_if_needed(savage, events);
        return SavageStep::AwaitFood;
    }
    SavageStep::Ate {
        servings: state.take_serving(savage, events),
    }
}

/// Pause between two meals, spent outside the pot lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EatPause {
    /// Fixed part of the pause
    pub time: Duration,
    /// Upper bound of a random extra
    pub jitter: Duration,
}

impl EatPause {
    pub fn new(time: Duration, jitter: Duration) -> Self {
        Self { time, jitter }
    }

    /// Draw one pause length
    pub fn sample(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.time;
        }
        let bound = u64::try_from(self.jitter.as_micros()).unwrap_or(u64::MAX);
        let extra = rand::rng().random_range(0..=bound);
        self.time.saturating_add(Duration::from_micros(extra))
    }
}

/// What one savage did before leaving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavageOutcome {
    pub id: usize,
    pub bites: u64,
    /// Left because of shutdown rather than a finished quota
    pub cancelled: bool,
}

/// One consumer
pub struct Savage {
    id: usize,
    monitor: Arc<Monitor>,
    sink: Arc<dyn EventSink>,
    pause: EatPause,
}

impl Savage {
    pub fn new(id: usize, monitor: Arc<Monitor>, sink: Arc<dyn EventSink>, pause: EatPause) -> Self {
        Self {
            id,
            monitor,
            sink,
            pause,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Block until allowed to eat and food is there, then take one serving
    ///
    /// Returns the servings left in the pot.
    pub fn eat_once(&self) -> Result<usize, EngineError> {
        let mut events = Vec::new();
        let step = {
            let mut state = self.monitor.lock();
            loop {
                let step = try_eat(&mut state, self.id, &mut events);
                self.monitor.wake_if_pending(&mut state);
                match step {
                    SavageStep::AwaitRound | SavageStep::AwaitFood => state = self.monitor.wait(state),
                    step => break step,
                }
            }
        };

        for event in &events {
            self.sink.record(event);
        }

        match step {
            SavageStep::Ate { servings } => Ok(servings),
            _ => Err(EngineError::CancellationRequested),
        }
    }

    /// Eat `quota` times (forever when `None`) or until cancelled
    pub fn run(self, quota: Option<u64>) -> SavageOutcome {
        info!(savage = self.id, ?quota, "Savage: sitting down");
        let mut bites = 0;
        let mut cancelled = false;

        while quota.is_none_or(|q| bites < q) {
            match self.eat_once() {
                Ok(servings) => {
                    bites += 1;
                    debug!(savage = self.id, bites, servings, "Savage: ate");
                }
                Err(_) => {
                    cancelled = true;
                    break;
                }
            }
            if quota.is_none_or(|q| bites < q) {
                thread::sleep(self.pause.sample());
            }
        }

        self.retire();
        info!(savage = self.id, bites, cancelled, "Savage: leaving");
        SavageOutcome {
            id: self.id,
            bites,
            cancelled,
        }
    }

    fn retire(&self) {
        let mut state = self.monitor.lock();
        state.retire(self.id);
        self.monitor.wake_if_pending(&mut state);
    }
}
