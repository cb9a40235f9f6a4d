//! Event Bus - broadcast fan-out of pot events to async subscribers
//!
//! Worker threads publish through the [`EventSink`] impl; the CLI's echo task
//! and the JSONL logger subscribe. `broadcast::Sender::send` never blocks, so
//! it is safe to call from the synchronous worker threads.

use tokio::sync::broadcast;
use tracing::debug;

use super::sink::EventSink;
use super::types::PotEvent;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Central event bus for pot activity
pub struct EventBus {
    tx: broadcast::Sender<PotEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped. If a
    /// subscriber lags past the capacity, its oldest events are dropped.
    pub fn emit(&self, event: PotEvent) {
        debug!(seq = event.seq, event_type = event.event_type(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<PotEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl EventSink for EventBus {
    fn record(&self, event: &PotEvent) {
        self.emit(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::EventKind;

    fn refilled(seq: u64) -> PotEvent {
        PotEvent {
            seq,
            kind: EventKind::Refilled,
            savage: None,
            servings: 5,
            round: None,
            generation: seq,
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(refilled(0));
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.record(&refilled(0));
        bus.record(&refilled(1));

        assert_eq!(rx.recv().await.unwrap().seq, 0);
        assert_eq!(rx.recv().await.unwrap().seq, 1);
    }

    #[tokio::test]
    async fn test_dropping_bus_closes_channel() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.emit(refilled(0));
        drop(bus);

        assert!(rx.recv().await.is_ok());
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Closed)));
    }
}
