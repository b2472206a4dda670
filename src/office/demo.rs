//! Demo pulse: synthetic traffic for an otherwise quiet office
//!
//! While no task has ever reached the feed, every interval it assigns a random
//! task to a random agent and follows up with a "started" event shortly after.

use tracing::info;

use super::Office;
use super::agent::{AgentId, ROSTER};
use super::events::{EventOutcome, TaskEvent, TaskStatus};
use super::random::RandomSource;
use super::scheduler::SimTime;

/// Time between pulses
pub const DEMO_INTERVAL_MS: u64 = 14_000;

/// Delay from the assignment to its "started" follow-up
pub const DEMO_START_DELAY_MS: u64 = 500;

const TITLES: [&str; 5] = [
    "New thread",
    "Code fix",
    "Campaign tweak",
    "Schedule task",
    "Market check",
];

const SOURCES: [&str; 3] = ["slack", "telegram", "openclaw"];

/// Synthetic task generator
pub struct DemoPulse {
    rng: Box<dyn RandomSource>,
    interval_ms: u64,
    next_at: SimTime,
    pending_start: Option<(SimTime, TaskEvent)>,
}

impl DemoPulse {
    /// Create a pulse that first fires one interval after `start`
    pub fn new(rng: Box<dyn RandomSource>, start: SimTime) -> Self {
        Self::with_interval(rng, start, DEMO_INTERVAL_MS)
    }

    /// Create a pulse with a custom interval
    pub fn with_interval(rng: Box<dyn RandomSource>, start: SimTime, interval_ms: u64) -> Self {
        Self {
            rng,
            interval_ms,
            next_at: start + interval_ms,
            pending_start: None,
        }
    }

    /// Emit whatever is due at the office's current time. Call once per tick.
    pub fn poll(&mut self, office: &mut Office) -> Vec<EventOutcome> {
        let now = office.now();
        let mut outcomes = Vec::new();

        if self.pending_start.as_ref().is_some_and(|(at, _)| *at <= now) {
            if let Some((_, mut started)) = self.pending_start.take() {
                started.title = TITLES[self.rng.index(TITLES.len())].to_string();
                started.timestamp = office.timestamp();
                outcomes.push(office.apply_event(started));
            }
        }

        if now >= self.next_at {
            self.next_at = now + self.interval_ms;
            if office.feed().task_count() == 0 {
                let assigned = self.generate(office);
                info!(agent = %assigned.agent_id, task = %assigned.task_id, "demo task");
                let started = TaskEvent {
                    event_id: format!("{}-s", assigned.task_id),
                    status: TaskStatus::Started,
                    ..assigned.clone()
                };
                self.pending_start = Some((now + DEMO_START_DELAY_MS, started));
                outcomes.push(office.apply_event(assigned));
            }
        }
        outcomes
    }

    fn generate(&mut self, office: &Office) -> TaskEvent {
        let agent = ROSTER[self.rng.index(ROSTER.len())].id;
        let source = SOURCES[self.rng.index(SOURCES.len())];
        let title = TITLES[self.rng.index(TITLES.len())];
        let task_id = format!("{}-{}", source, office.wall_clock().timestamp_millis());
        TaskEvent {
            event_id: format!("{task_id}-a"),
            task_id,
            agent_id: AgentId::from(agent),
            status: TaskStatus::Assigned,
            source: source.to_string(),
            title: title.to_string(),
            timestamp: office.timestamp(),
        }
    }
}
