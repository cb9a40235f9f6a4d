//! Pot event stream
//!
//! Every transition of the pot (refill request, refill, bite, round reset)
//! becomes a [`PotEvent`]. Workers hand events to an [`EventSink`] once they
//! have released the pot lock.
//!
//! # Architecture
//!
//! ```text
//!    cook thread        savage threads
//!         │                   │
//!         └───── PotEvent ────┘
//!                   │
//!                   ▼
//!            Arc<dyn EventSink>
//!         ┌─────────┼──────────────┐
//!         ▼         ▼              ▼
//!   TracingSink  RecordingSink  EventBus (tokio broadcast)
//!                                  ├── echo task (CLI)
//!                                  └── EventLogger (.jsonl)
//! ```

mod bus;
mod logger;
mod sink;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus};
pub use logger::{EVENTS_FILE, EventLogger, list_runs, read_run_events, spawn_event_logger};
pub use sink::{EventSink, RecordingSink, Tee, TracingSink};
pub use types::{EventKind, EventLogEntry, PotEvent, ResetKind};
