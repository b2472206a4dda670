//! Deterministic timer queue for delayed continuations
//!
//! Invite resolutions and meeting timers are entries in a min-heap keyed by
//! fire time, drained at the start of every tick. Entries carry the tokens
//! they were scheduled under; the handler re-validates before acting.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::ops::Add;

use super::agent::AgentId;

/// Simulated time in milliseconds since the simulation started
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SimTime(pub u64);

impl SimTime {
    /// Time zero
    pub const ZERO: SimTime = SimTime(0);

    /// A time that never arrives
    pub const NEVER: SimTime = SimTime(u64::MAX);

    /// Milliseconds since start
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl Add<u64> for SimTime {
    type Output = SimTime;

    fn add(self, ms: u64) -> SimTime {
        SimTime(self.0.saturating_add(ms))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// What to do when a timer fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// Resolve a game invitation handshake
    InviteResolution {
        /// Agent that proposed
        initiator: AgentId,
        /// Initiator's invite token at proposal time
        initiator_token: u64,
        /// Agent that was asked
        invitee: AgentId,
        /// Invitee's invite token at proposal time
        invitee_token: u64,
    },
    /// Periodic meeting check
    MeetingCheck,
    /// End of a running meeting
    MeetingEnd {
        /// Meeting the timer belongs to
        meeting: u64,
    },
}

/// Timer entry in the queue
#[derive(Debug, Clone)]
pub struct ScheduledTimer {
    /// When the timer fires
    pub fire_at: SimTime,
    /// Insertion order, breaks ties between equal fire times
    pub sequence: u64,
    /// Continuation to run
    pub kind: TimerKind,
}

impl PartialEq for ScheduledTimer {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.sequence == other.sequence
    }
}

impl Eq for ScheduledTimer {}

impl PartialOrd for ScheduledTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest fire time first)
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Min-heap of pending timers
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<ScheduledTimer>,
    next_sequence: u64,
}

impl TimerQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a continuation
    pub fn schedule(&mut self, fire_at: SimTime, kind: TimerKind) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledTimer {
            fire_at,
            sequence,
            kind,
        });
    }

    /// Pop the earliest timer if it is due at `now`
    pub fn pop_due(&mut self, now: SimTime) -> Option<ScheduledTimer> {
        if self.heap.peek()?.fire_at <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Fire time of the earliest pending timer
    pub fn next_fire(&self) -> Option<SimTime> {
        self.heap.peek().map(|t| t.fire_at)
    }

    /// Fire time of the earliest pending timer matching a predicate
    pub fn find(&self, mut pred: impl FnMut(&TimerKind) -> bool) -> Option<SimTime> {
        self.heap
            .iter()
            .filter(|t| pred(&t.kind))
            .map(|t| t.fire_at)
            .min()
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no timers are pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
