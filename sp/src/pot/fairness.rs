//! Per-round fairness bookkeeping

use serde::{Deserialize, Serialize};

use crate::events::ResetKind;

/// Tracks which savages have eaten in the current round
///
/// Savage ids are 1-based. The population is fixed at creation; savages may
/// retire (leave for good) but never join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairnessTracker {
    eaten: Vec<bool>,
    retired: Vec<bool>,
    round: u64,
    natural_resets: u64,
    forced_resets: u64,
}

impl FairnessTracker {
    pub fn new(savages: usize) -> Self {
        Self {
            eaten: vec![false; savages],
            retired: vec![false; savages],
            round: 0,
            natural_resets: 0,
            forced_resets: 0,
        }
    }

    fn slot(&self, id: usize) -> usize {
        assert!(
            (1..=self.eaten.len()).contains(&id),
            "savage {} is not registered (population {})",
            id,
            self.eaten.len()
        );
        id - 1
    }

    pub fn savages(&self) -> usize {
        self.eaten.len()
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn natural_resets(&self) -> u64 {
        self.natural_resets
    }

    pub fn forced_resets(&self) -> u64 {
        self.forced_resets
    }

    pub fn has_eaten(&self, id: usize) -> bool {
        self.eaten[self.slot(id)]
    }

    /// Number of flags currently set
    pub fn eaten_count(&self) -> usize {
        self.eaten.iter().filter(|e| **e).count()
    }

    pub fn mark_eaten(&mut self, id: usize) {
        let slot = self.slot(id);
        assert!(!self.eaten[slot], "savage {} ate twice in round {}", id, self.round);
        self.eaten[slot] = true;
    }

    /// Remove a savage from future "all have eaten" checks
    pub fn retire(&mut self, id: usize) {
        let slot = self.slot(id);
        self.retired[slot] = true;
    }

    /// Whether every savage still at the table has eaten this round
    pub fn all_have_eaten(&self) -> bool {
        self.eaten
            .iter()
            .zip(&self.retired)
            .all(|(eaten, retired)| *eaten || *retired)
    }

    /// Clear every flag and start the next round
    ///
    /// Returns how many flags were set before the reset.
    pub fn reset(&mut self, kind: ResetKind) -> usize {
        let cleared = self.eaten_count();
        self.eaten.iter_mut().for_each(|e| *e = false);
        self.round += 1;
        match kind {
            ResetKind::Natural => self.natural_resets += 1,
            ResetKind::Forced => self.forced_resets += 1,
        }
        cleared
    }
}
