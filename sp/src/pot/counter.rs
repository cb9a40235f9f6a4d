//! The bounded pot counter

use serde::{Deserialize, Serialize};

/// Shared bounded counter of servings
///
/// Plain data: callers hold the pot lock and do the signaling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pot {
    servings: usize,
    capacity: usize,
    refill_requested: bool,
}

impl Pot {
    /// Create a full pot
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "pot capacity must be positive");
        Self {
            servings: capacity,
            capacity,
            refill_requested: false,
        }
    }

    pub fn servings(&self) -> usize {
        self.servings
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn refill_requested(&self) -> bool {
        self.refill_requested
    }

    pub fn is_empty(&self) -> bool {
        self.servings == 0
    }

    /// Raise the refill request unless one is already pending
    ///
    /// Returns true only for the call that raised it.
    pub fn request_refill_if_needed(&mut self) -> bool {
        if self.refill_requested {
            return false;
        }
        assert!(
            self.is_empty(),
            "refill requested for a pot holding {} servings",
            self.servings
        );
        self.refill_requested = true;
        true
    }

    /// Whether the cook may refill right now
    pub fn ready_for_refill(&self) -> bool {
        self.is_empty() && self.refill_requested
    }

    /// Fill back to capacity and clear the request
    pub fn refill(&mut self) {
        assert!(
            self.ready_for_refill(),
            "refill of a pot with {} servings (requested: {})",
            self.servings,
            self.refill_requested
        );
        self.servings = self.capacity;
        self.refill_requested = false;
    }

    /// Take one serving, returning what is left
    pub fn take_serving(&mut self) -> usize {
        assert!(self.servings > 0, "serving taken from an empty pot");
        self.servings -= 1;
        self.servings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_pot_is_full() {
        let pot = Pot::new(5);
        assert_eq!(pot.servings(), 5);
        assert_eq!(pot.capacity(), 5);
        assert!(!pot.is_empty());
        assert!(!pot.refill_requested());
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_panics() {
        let _ = Pot::new(0);
    }

    #[test]
    fn test_take_until_empty() {
        let mut pot = Pot::new(2);
        assert_eq!(pot.take_serving(), 1);
        assert_eq!(pot.take_serving(), 0);
        assert!(pot.is_empty());
    }

    #[test]
    #[should_panic(expected = "empty pot")]
    fn test_take_from_empty_panics() {
        let mut pot = Pot::new(1);
        pot.take_serving();
        pot.take_serving();
    }

    #[test]
    fn test_refill_request_is_idempotent() {
        let mut pot = Pot::new(1);
        pot.take_serving();

        assert!(pot.request_refill_if_needed());
        assert!(!pot.request_refill_if_needed());
        assert!(!pot.request_refill_if_needed());
        assert!(pot.refill_requested());

        pot.refill();
        assert_eq!(pot.servings(), 1);
        assert!(!pot.refill_requested());
    }

    #[test]
    #[should_panic(expected = "refill of a pot")]
    fn test_refill_without_request_panics() {
        let mut pot = Pot::new(3);
        for _ in 0..3 {
            pot.take_serving();
        }
        pot.refill();
    }

    #[derive(Debug, Clone)]
    enum Op {
        Take,
        Request,
        Refill,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Take), Just(Op::Request), Just(Op::Refill)]
    }

    proptest! {
        #[test]
        fn servings_stay_within_capacity(capacity in 1usize..10, ops in prop::collection::vec(op(), 0..200)) {
            let mut pot = Pot::new(capacity);
            for op in ops {
                // Only apply operations whose guards hold, like the workers do
                match op {
                    Op::Take if !pot.is_empty() => {
                        pot.take_serving();
                    }
                    Op::Request if pot.is_empty() => {
                        pot.request_refill_if_needed();
                    }
                    Op::Refill if pot.ready_for_refill() => pot.refill(),
                    _ => {}
                }
                prop_assert!(pot.servings() <= pot.capacity());
                prop_assert!(!pot.refill_requested() || pot.is_empty());
            }
        }
    }
}
