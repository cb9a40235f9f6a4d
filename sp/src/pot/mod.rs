//! The shared pot
//!
//! - [`Pot`] - the bounded serving counter
//! - [`FairnessTracker`] - who has eaten this round
//! - [`PotState`] - everything guarded by the pot lock
//! - [`Monitor`] - the lock and its condition variable
//! - [`ShutdownHandle`] - cooperative cancellation of every waiter

mod counter;
mod fairness;
mod monitor;
mod state;

pub use counter::Pot;
pub use fairness::FairnessTracker;
pub use monitor::{Monitor, ShutdownHandle};
pub use state::PotState;
