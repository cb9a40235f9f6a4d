//! Deterministic single-threaded interleavings
//!
//! Runs the same step functions as the worker threads, one actor at a time,
//! following a caller-chosen schedule. Condition-variable waits are modeled
//! by a wait queue: an actor whose guard fails is parked and ignores the
//! schedule until a wake reaches it. With [`WakePolicy::One`] only the
//! longest-parked actor is woken, which is how a lost wakeup shows up.

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use crate::events::PotEvent;
use crate::pot::PotState;
use crate::worker::{CookStep, SavageStep, try_eat, try_refill};

/// A worker taking part in the interleaving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Actor {
    Cook,
    Savage(usize),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Cook => write!(f, "cook"),
            Actor::Savage(id) => write!(f, "savage-{}", id),
        }
    }
}

/// How a pending wake reaches parked actors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WakePolicy {
    /// Wake every parked actor (what the engine does)
    #[default]
    Broadcast,
    /// Wake only the longest-parked actor
    One,
}

/// What a single scheduled step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The cook refilled the pot
    Refilled,
    /// A savage took a serving
    Ate,
    /// The actor's guard failed and it parked
    Parked,
    /// The actor was parked already; nothing happened
    Asleep,
    /// The savage already finished its quota
    Finished,
}

/// Result of a scheduled run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimOutcome {
    pub steps: usize,
    /// Every savage finished its quota
    pub finished: bool,
    /// Every remaining actor is parked with nobody left to wake it
    pub deadlocked: bool,
}

/// Single-threaded model of one engine
pub struct Interleaving {
    state: PotState,
    events: Vec<PotEvent>,
    parked: VecDeque<Actor>,
    finished: Vec<bool>,
    quota: u64,
    wake: WakePolicy,
}

impl Interleaving {
    /// Model with every savage eating once
    pub fn new(capacity: usize, savages: usize, fair: bool) -> Self {
        Self {
            state: PotState::new(capacity, savages, fair),
            events: Vec::new(),
            parked: VecDeque::new(),
            finished: vec![false; savages],
            quota: 1,
            wake: WakePolicy::Broadcast,
        }
    }

    /// Every savage eats `quota` times before leaving
    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_wake_policy(mut self, wake: WakePolicy) -> Self {
        self.wake = wake;
        self
    }

    pub fn state(&self) -> &PotState {
        &self.state
    }

    pub fn events(&self) -> &[PotEvent] {
        &self.events
    }

    pub fn is_parked(&self, actor: Actor) -> bool {
        self.parked.contains(&actor)
    }

    fn savages(&self) -> usize {
        self.finished.len()
    }

    /// Actors still taking part, cook first
    pub fn live_actors(&self) -> Vec<Actor> {
        std::iter::once(Actor::Cook)
            .chain(
                (1..=self.savages())
                    .filter(|id| !self.finished[id - 1])
                    .map(Actor::Savage),
            )
            .collect()
    }

    pub fn all_finished(&self) -> bool {
        self.finished.iter().all(|f| *f)
    }

    /// Every live actor sleeps and nothing can wake it
    pub fn is_deadlocked(&self) -> bool {
        !self.all_finished() && self.live_actors().iter().all(|a| self.parked.contains(a))
    }

    fn deliver_wake(&mut self) {
        if !self.state.take_pending_wake() {
            return;
        }
        match self.wake {
            WakePolicy::Broadcast => self.parked.clear(),
            WakePolicy::One => {
                self.parked.pop_front();
            }
        }
    }

    /// Let `actor` evaluate its guard once
    pub fn step(&mut self, actor: Actor) -> StepOutcome {
        if let Actor::Savage(id) = actor {
            if self.finished[id - 1] {
                return StepOutcome::Finished;
            }
        }
        if self.parked.contains(&actor) {
            return StepOutcome::Asleep;
        }

        let outcome = match actor {
            Actor::Cook => match try_refill(&mut self.state, &mut self.events) {
                CookStep::Refilled => StepOutcome::Refilled,
                CookStep::Wait | CookStep::Cancelled => StepOutcome::Parked,
            },
            Actor::Savage(id) => match try_eat(&mut self.state, id, &mut self.events) {
                SavageStep::Ate { .. } => {
                    if self.state.bites()[id - 1] >= self.quota {
                        self.finished[id - 1] = true;
                        self.state.retire(id);
                    }
                    StepOutcome::Ate
                }
                _ => StepOutcome::Parked,
            },
        };

        // Signal first, then wait: the actor raising a wake never wakes itself
        self.deliver_wake();
        if outcome == StepOutcome::Parked {
            self.parked.push_back(actor);
        }
        debug!(%actor, ?outcome, servings = self.state.pot().servings(), "Interleaving::step");
        outcome
    }

    /// Follow an explicit schedule
    pub fn run<I>(&mut self, schedule: I) -> Vec<StepOutcome>
    where
        I: IntoIterator<Item = Actor>,
    {
        schedule.into_iter().map(|actor| self.step(actor)).collect()
    }

    /// Cycle through the live actors until everyone finished, a deadlock, or
    /// `max_steps`
    pub fn run_round_robin(&mut self, max_steps: usize) -> SimOutcome {
        let mut steps = 0;
        while steps < max_steps && !self.all_finished() && !self.is_deadlocked() {
            for actor in self.live_actors() {
                self.step(actor);
                steps += 1;
            }
        }
        SimOutcome {
            steps,
            finished: self.all_finished(),
            deadlocked: self.is_deadlocked(),
        }
    }
}
