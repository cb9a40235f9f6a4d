//! Event sinks - pluggable receivers for pot transitions
//!
//! Workers hand events to a sink only after releasing the pot lock, so a sink
//! may take its own locks without nesting them inside the pot's. Events from
//! different workers can therefore arrive out of order; `seq` restores it.

use std::sync::{Arc, Mutex};

use tracing::info;

use super::types::PotEvent;

/// Receiver for pot transitions
pub trait EventSink: Send + Sync {
    /// Record one event
    fn record(&self, event: &PotEvent);
}

/// Sink that turns every event into a structured log line
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &PotEvent) {
        info!(
            seq = event.seq,
            kind = event.event_type(),
            savage = ?event.savage,
            servings = event.servings,
            round = ?event.round,
            generation = event.generation,
            "{}",
            event
        );
    }
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PotEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, ordered by `seq`
    pub fn events(&self) -> Vec<PotEvent> {
        let mut events = match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        events.sort_by_key(|e| e.seq);
        events
    }

    pub fn len(&self) -> usize {
        match self.events.lock() {
            Ok(events) => events.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &PotEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Sink that forwards every event to several other sinks
#[derive(Default, Clone)]
pub struct Tee {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Tee {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    /// Add another sink to the fan-out
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for Tee {
    fn record(&self, event: &PotEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
