//! Everything the pot lock guards

use crate::events::{EventKind, PotEvent, ResetKind};

use super::counter::Pot;
use super::fairness::FairnessTracker;

/// Shared state of one engine: the pot, the fairness tracker and run bookkeeping
///
/// Every mutation happens under the monitor's lock. Operations append the
/// events they cause to a caller-owned buffer and note when waiters must be
/// woken; the caller publishes and signals.
#[derive(Debug, Clone)]
pub struct PotState {
    pot: Pot,
    fairness: Option<FairnessTracker>,
    generation: u64,
    next_seq: u64,
    bites: Vec<u64>,
    pending_wake: bool,
    cancelled: bool,
}

impl PotState {
    /// Full pot, `savages` registered eaters, fairness tracking when `fair`
    pub fn new(capacity: usize, savages: usize, fair: bool) -> Self {
        Self {
            pot: Pot::new(capacity),
            fairness: fair.then(|| FairnessTracker::new(savages)),
            generation: 0,
            next_seq: 0,
            bites: vec![0; savages],
            pending_wake: false,
            cancelled: false,
        }
    }

    pub fn pot(&self) -> &Pot {
        &self.pot
    }

    pub fn fairness(&self) -> Option<&FairnessTracker> {
        self.fairness.as_ref()
    }

    pub fn is_fair(&self) -> bool {
        self.fairness.is_some()
    }

    /// Refills performed so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bites taken per savage, indexed by `id - 1`
    pub fn bites(&self) -> &[u64] {
        &self.bites
    }

    pub fn total_bites(&self) -> u64 {
        self.bites.iter().sum()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Ask every worker to stop at its next wake
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.pending_wake = true;
    }

    /// Consume the "waiters must be woken" note
    pub fn take_pending_wake(&mut self) -> bool {
        std::mem::take(&mut self.pending_wake)
    }

    fn event(&mut self, kind: EventKind, savage: Option<usize>) -> PotEvent {
        let seq = self.next_seq;
        self.next_seq += 1;
        PotEvent {
            seq,
            kind,
            savage,
            servings: self.pot.servings(),
            round: self.fairness.as_ref().map(|f| f.round()),
            generation: self.generation,
        }
    }

    /// A savage found the pot empty; raise the request unless already raised
    pub fn request_refill_if_needed(&mut self, savage: usize, events: &mut Vec<PotEvent>) -> bool {
        if !self.pot.request_refill_if_needed() {
            return false;
        }
        // Cook and savages share one condition variable, so only a broadcast
        // is guaranteed to reach the cook.
        self.pending_wake = true;
        events.push(self.event(EventKind::RefillRequested, Some(savage)));
        true
    }

    /// Fill the pot and force a new fairness round
    pub fn refill(&mut self, events: &mut Vec<PotEvent>) {
        self.pot.refill();
        self.generation += 1;
        self.pending_wake = true;
        events.push(self.event(EventKind::Refilled, None));

        if let Some(fairness) = self.fairness.as_mut() {
            let cleared = fairness.reset(ResetKind::Forced);
            events.push(self.event(
                EventKind::RoundReset {
                    reset: ResetKind::Forced,
                    cleared,
                },
                None,
            ));
        }
    }

    /// Whether `savage` may eat in the current round
    pub fn may_eat(&self, savage: usize) -> bool {
        self.fairness.as_ref().is_none_or(|f| !f.has_eaten(savage))
    }

    /// Start a new round if every savage at the table has eaten
    pub fn try_natural_reset(&mut self, savage: usize, events: &mut Vec<PotEvent>) -> bool {
        let Some(fairness) = self.fairness.as_mut() else {
            return false;
        };
        if !fairness.all_have_eaten() {
            return false;
        }
        let cleared = fairness.reset(ResetKind::Natural);
        self.pending_wake = true;
        events.push(self.event(
            EventKind::RoundReset {
                reset: ResetKind::Natural,
                cleared,
            },
            Some(savage),
        ));
        true
    }

    /// Take one serving on behalf of `savage`, returning what is left
    pub fn take_serving(&mut self, savage: usize, events: &mut Vec<PotEvent>) -> usize {
        let left = self.pot.take_serving();
        self.bites[savage - 1] += 1;
        if let Some(fairness) = self.fairness.as_mut() {
            fairness.mark_eaten(savage);
            self.pending_wake = true;
        }
        events.push(self.event(EventKind::Bite, Some(savage)));
        left
    }

    /// `savage` leaves the table for good
    pub fn retire(&mut self, savage: usize) {
        if let Some(fairness) = self.fairness.as_mut() {
            fairness.retire(savage);
            self.pending_wake = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_sequenced() {
        let mut state = PotState::new(2, 3, false);
        let mut events = Vec::new();

        state.take_serving(1, &mut events);
        state.take_serving(2, &mut events);
        assert!(state.request_refill_if_needed(3, &mut events));
        state.refill(&mut events);

        let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
        assert_eq!(events[1].servings, 0);
        assert_eq!(events[3].kind, EventKind::Refilled);
        assert_eq!(events[3].servings, 2);
        assert_eq!(events[3].generation, 1);
        assert_eq!(state.total_bites(), 2);
    }

    #[test]
    fn test_baseline_bite_needs_no_wake() {
        let mut state = PotState::new(3, 4, false);
        let mut events = Vec::new();
        state.take_serving(1, &mut events);
        assert!(!state.take_pending_wake());
        assert!(state.may_eat(1));
        assert_eq!(events[0].round, None);
    }

    #[test]
    fn test_fair_bite_marks_and_wakes() {
        let mut state = PotState::new(3, 4, true);
        let mut events = Vec::new();
        state.take_serving(2, &mut events);
        assert!(state.take_pending_wake());
        assert!(!state.take_pending_wake());
        assert!(!state.may_eat(2));
        assert!(state.may_eat(1));
        assert_eq!(events[0].round, Some(0));
    }

    #[test]
    fn test_refill_request_wakes_once() {
        let mut state = PotState::new(1, 2, false);
        let mut events = Vec::new();
        state.take_serving(1, &mut events);

        assert!(state.request_refill_if_needed(2, &mut events));
        assert!(state.take_pending_wake());
        assert!(!state.request_refill_if_needed(1, &mut events));
        assert!(!state.take_pending_wake());
        assert_eq!(events.iter().filter(|e| e.kind == EventKind::RefillRequested).count(), 1);
    }

    #[test]
    fn test_refill_forces_round_reset() {
        let mut state = PotState::new(1, 2, true);
        let mut events = Vec::new();
        state.take_serving(1, &mut events);
        state.request_refill_if_needed(2, &mut events);
        state.refill(&mut events);

        let reset = events.last().unwrap();
        assert_eq!(
            reset.kind,
            EventKind::RoundReset {
                reset: ResetKind::Forced,
                cleared: 1
            }
        );
        assert_eq!(reset.round, Some(1));
        assert!(state.may_eat(1));
        assert_eq!(state.fairness().unwrap().forced_resets(), 1);
    }

    #[test]
    fn test_natural_reset_only_when_everyone_ate() {
        let mut state = PotState::new(5, 2, true);
        let mut events = Vec::new();
        state.take_serving(1, &mut events);
        assert!(!state.try_natural_reset(1, &mut events));

        state.take_serving(2, &mut events);
        assert!(state.try_natural_reset(1, &mut events));
        assert_eq!(events.last().unwrap().reset_kind(), Some(ResetKind::Natural));
        assert_eq!(events.last().unwrap().savage, Some(1));
        assert!(state.may_eat(1) && state.may_eat(2));
    }

    #[test]
    fn test_natural_reset_ignored_in_baseline() {
        let mut state = PotState::new(5, 2, false);
        let mut events = Vec::new();
        state.take_serving(1, &mut events);
        state.take_serving(2, &mut events);
        assert!(!state.try_natural_reset(1, &mut events));
    }

    #[test]
    fn test_cancel_sets_wake() {
        let mut state = PotState::new(5, 6, false);
        state.cancel();
        assert!(state.is_cancelled());
        assert!(state.take_pending_wake());
    }
}
