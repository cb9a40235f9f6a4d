//! Cook and savage workers
//!
//! Each worker's guard logic is a pure step function over [`PotState`]
//! (`try_refill`, `try_eat`) so the threaded loops and the deterministic
//! simulator in [`crate::sim`] run the exact same transitions.
//!
//! [`PotState`]: crate::pot::PotState

mod cook;
mod savage;

pub use cook::{Cook, CookStep, try_refill};
pub use savage::{EatPause, Savage, SavageOutcome, SavageStep, try_eat};
