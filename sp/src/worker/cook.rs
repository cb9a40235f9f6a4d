//! The cook: waits for an empty pot and a request, then refills

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::EngineError;
use crate::events::{EventSink, PotEvent};
use crate::pot::{Monitor, PotState};

/// Result of one evaluation of the cook's guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookStep {
    /// The pot was refilled
    Refilled,
    /// Guard false: pot not empty or no request yet
    Wait,
    /// Shutdown requested
    Cancelled,
}

/// Evaluate the cook's guard once and refill if it holds
///
/// Caller holds the pot lock.
pub fn try_refill(state: &mut PotState, events: &mut Vec<PotEvent>) -> CookStep {
    if state.is_cancelled() {
        return CookStep::Cancelled;
    }
    if !state.pot().ready_for_refill() {
        return CookStep::Wait;
    }
    state.refill(events);
    CookStep::Refilled
}

/// The single producer
pub struct Cook {
    monitor: Arc<Monitor>,
    sink: Arc<dyn EventSink>,
}

impl Cook {
    pub fn new(monitor: Arc<Monitor>, sink: Arc<dyn EventSink>) -> Self {
        Self { monitor, sink }
    }

    /// Block until a refill is due, then perform it
    pub fn serve_once(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();
        let step = {
            let mut state = self.monitor.lock();
            loop {
                match try_refill(&mut state, &mut events) {
                    CookStep::Wait => state = self.monitor.wait(state),
                    step => {
                        self.monitor.wake_if_pending(&mut state);
                        break step;
                    }
                }
            }
        };

        for event in &events {
            self.sink.record(event);
        }

        match step {
            CookStep::Cancelled => Err(EngineError::CancellationRequested),
            _ => Ok(()),
        }
    }

    /// Refill on demand until cancelled; returns the number of refills
    pub fn run(self) -> u64 {
        info!("Cook: starting");
        let mut refills = 0;
        loop {
            match self.serve_once() {
                Ok(()) => {
                    refills += 1;
                    debug!(refills, "Cook: refilled");
                }
                Err(_) => break,
            }
        }
        info!(refills, "Cook: stopping");
        refills
    }
}
