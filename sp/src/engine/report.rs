//! Final state of an engine run

use serde::{Deserialize, Serialize};

use super::config::{Policy, RunMode};

/// What an engine run left behind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub policy: Policy,
    pub mode: RunMode,
    pub capacity: usize,
    pub savages: usize,

    /// Servings left in the pot when the run ended
    pub final_servings: usize,

    /// Refills performed by the cook
    pub refills: u64,

    /// Bites taken per savage, indexed by `id - 1`
    pub bites_per_savage: Vec<u64>,

    pub total_bites: u64,

    /// Last fairness round (fair policy only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u64>,

    pub natural_resets: u64,
    pub forced_resets: u64,

    /// The run ended through cancellation rather than finished quotas
    pub cancelled: bool,

    pub elapsed_ms: u64,
}

impl RunReport {
    /// Difference between the hungriest and the best-fed savage
    pub fn bite_spread(&self) -> u64 {
        let max = self.bites_per_savage.iter().max().copied().unwrap_or_default();
        let min = self.bites_per_savage.iter().min().copied().unwrap_or_default();
        max - min
    }

    /// Bites taken by savage `id`
    pub fn bites_of(&self, id: usize) -> u64 {
        id.checked_sub(1)
            .and_then(|slot| self.bites_per_savage.get(slot))
            .copied()
            .unwrap_or_default()
    }
}
