//! savagepot - the dining savages around a bounded pot
//!
//! One cook thread refills a pot of `N` servings; `M` savage threads take one
//! serving at a time. A savage that finds the pot empty asks the cook for a
//! refill and waits; the cook sleeps until asked. Under the fair policy every
//! savage eats once per round before anyone eats twice, and every refill
//! forces a new round.
//!
//! # Core Concepts
//!
//! - **One monitor**: all pot state sits behind a single mutex and condvar
//! - **Pure steps**: guard logic lives in [`worker::try_eat`] and
//!   [`worker::try_refill`], shared by threads and the [`sim`] model
//! - **Events after unlock**: every transition becomes a [`PotEvent`] that
//!   sinks receive once the pot lock is released
//!
//! # Modules
//!
//! - [`pot`] - pot counter, fairness rounds, shared monitor
//! - [`worker`] - cook and savage loops
//! - [`engine`] - run orchestration and reports
//! - [`events`] - event types, sinks, broadcast bus, JSONL logger
//! - [`audit`] - invariant checks over recorded events
//! - [`sim`] - deterministic single-threaded interleavings
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod audit;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod pot;
pub mod sim;
pub mod worker;

// Re-export commonly used types
pub use audit::{AuditReport, audit_events, infer_capacity};
pub use config::Config;
pub use engine::{Engine, EngineConfig, Policy, RunMode, RunReport, create_engine};
pub use error::EngineError;
pub use events::{EventBus, EventKind, EventSink, PotEvent, RecordingSink, ResetKind, Tee, TracingSink};
pub use pot::ShutdownHandle;
