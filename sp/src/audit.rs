//! Event log auditing
//!
//! Replays an ordered list of [`PotEvent`]s and checks the pot's invariants:
//! servings stay within `[0, capacity]`, every bite removes exactly one
//! serving, refills only happen to an empty pot that asked for one, and under
//! the fair policy no savage bites twice in the same round.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::{EventKind, PotEvent, ResetKind};

/// Outcome of an audit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub events: usize,
    pub bites: u64,
    pub refill_requests: u64,
    pub refills: u64,
    pub natural_resets: u64,
    pub forced_resets: u64,

    /// Events missing from the sequence (e.g. a lagging subscriber)
    pub gaps: u64,

    /// Whether the log carried fairness rounds
    pub fair: bool,

    pub violations: Vec<String>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Best guess of the pot capacity from its events
///
/// A refill always fills to capacity; failing that, the first bite left
/// `capacity - 1` servings in the initially full pot.
pub fn infer_capacity(events: &[PotEvent]) -> Option<usize> {
    events
        .iter()
        .find(|e| e.kind == EventKind::Refilled)
        .map(|e| e.servings)
        .or_else(|| events.iter().find(|e| e.is_bite()).map(|e| e.servings + 1))
}

/// Audit `events` (in any order) against a pot of `capacity`
pub fn audit_events(events: &[PotEvent], capacity: usize) -> AuditReport {
    debug!(count = events.len(), capacity, "audit_events: called");

    let mut ordered: Vec<&PotEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.seq);

    let mut report = AuditReport {
        events: ordered.len(),
        fair: ordered.iter().any(|e| e.round.is_some()),
        ..Default::default()
    };

    let mut servings = capacity;
    let mut requested = false;
    let mut eaten_this_round: HashSet<usize> = HashSet::new();
    let mut tracked_round: Option<u64> = None;
    let mut last_seq: Option<u64> = None;
    let mut last_round: Option<u64> = None;

    for event in ordered {
        if let Some(prev) = last_seq {
            if event.seq == prev {
                report.violations.push(format!("seq {} appears twice", event.seq));
                continue;
            }
            if event.seq > prev + 1 {
                // Events are missing: resynchronize instead of flagging
                report.gaps += event.seq - prev - 1;
                servings = match event.kind {
                    EventKind::Bite => event.servings + 1,
                    EventKind::Refilled => 0,
                    _ => event.servings,
                };
                requested = event.kind == EventKind::Refilled;
            }
        }
        last_seq = Some(event.seq);

        if event.servings > capacity {
            report.violations.push(format!(
                "seq {}: {} servings exceed capacity {}",
                event.seq, event.servings, capacity
            ));
        }

        if let (Some(prev), Some(round)) = (last_round, event.round) {
            if round < prev {
                report
                    .violations
                    .push(format!("seq {}: round went back from {} to {}", event.seq, prev, round));
            }
        }
        last_round = event.round.or(last_round);

        match &event.kind {
            EventKind::Bite => {
                report.bites += 1;
                if servings == 0 {
                    report
                        .violations
                        .push(format!("seq {}: bite from an empty pot", event.seq));
                } else {
                    servings -= 1;
                }
                if event.servings != servings {
                    report.violations.push(format!(
                        "seq {}: bite left {} servings, expected {}",
                        event.seq, event.servings, servings
                    ));
                    servings = event.servings;
                }
                // A bite tagged with another round means its reset was lost
                if event.round != tracked_round {
                    eaten_this_round.clear();
                    tracked_round = event.round;
                }
                if let Some(savage) = event.savage {
                    if report.fair && !eaten_this_round.insert(savage) {
                        report.violations.push(format!(
                            "seq {}: savage {} ate twice in round {}",
                            event.seq,
                            savage,
                            event.round.unwrap_or_default()
                        ));
                    }
                }
            }
            EventKind::RefillRequested => {
                report.refill_requests += 1;
                if servings != 0 {
                    report.violations.push(format!(
                        "seq {}: refill requested with {} servings left",
                        event.seq, servings
                    ));
                }
                if requested {
                    report
                        .violations
                        .push(format!("seq {}: refill requested twice", event.seq));
                }
                requested = true;
            }
            EventKind::Refilled => {
                report.refills += 1;
                if servings != 0 || !requested {
                    report.violations.push(format!(
                        "seq {}: refill of a pot with {} servings (requested: {})",
                        event.seq, servings, requested
                    ));
                }
                if event.servings != capacity {
                    report.violations.push(format!(
                        "seq {}: refill to {} servings, capacity is {}",
                        event.seq, event.servings, capacity
                    ));
                }
                servings = event.servings;
                requested = false;
            }
            EventKind::RoundReset { reset, .. } => {
                match reset {
                    ResetKind::Natural => report.natural_resets += 1,
                    ResetKind::Forced => report.forced_resets += 1,
                }
                eaten_this_round.clear();
                tracked_round = event.round;
            }
        }
    }

    debug!(
        bites = report.bites,
        violations = report.violations.len(),
        "audit_events: done"
    );
    report
}
