//! Task events, de-duplication and the display feed

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use super::agent::AgentId;
use super::scheduler::SimTime;

/// Lifecycle status carried by a task event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task handed to an agent
    Assigned,
    /// Agent began the task
    Started,
    /// Task finished
    Done,
    /// Task failed
    Failed,
}

impl TaskStatus {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Assigned => "assigned",
            TaskStatus::Started => "started",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }

    /// Feed color
    pub fn color(&self) -> &'static str {
        match self {
            TaskStatus::Assigned => "#ffd166",
            TaskStatus::Started => "#64d2ff",
            TaskStatus::Done => "#48d597",
            TaskStatus::Failed => "#ff6262",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification color for a source tag
pub fn source_color(source: &str) -> &'static str {
    match source {
        "slack" => "#41c7f4",
        "telegram" => "#6dde8a",
        "openclaw" => "#ffd166",
        _ => "#ffd166",
    }
}

/// A task lifecycle event, as delivered by the ingestion adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEvent {
    /// Unique event id, used for de-duplication
    pub event_id: String,
    /// Task the event belongs to
    pub task_id: String,
    /// Target agent
    pub agent_id: AgentId,
    /// Lifecycle status
    pub status: TaskStatus,
    /// Free-form origin tag
    pub source: String,
    /// Display title
    pub title: String,
    /// ISO-8601 timestamp
    pub timestamp: String,
}

/// What happened to an event handed to the office
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event moved an agent's state machine
    Applied,
    /// The task was queued behind the agent's current work
    Queued,
    /// Recorded, no transition needed (repeat assignment, late start, ...)
    Ignored,
    /// Event id seen before
    Duplicate,
    /// Agent id or event fields missing
    Invalid,
    /// No agent with that id
    UnknownAgent,
}

impl EventOutcome {
    /// Whether the event was dropped before reaching the feed
    pub fn is_dropped(&self) -> bool {
        matches!(
            self,
            EventOutcome::Duplicate | EventOutcome::Invalid | EventOutcome::UnknownAgent
        )
    }
}

/// Kind of social pseudo-event shown in the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialKind {
    /// Game invitation sent
    InviteSent,
    /// Invitation accepted
    InviteAccepted,
    /// Invitation declined
    InviteDeclined,
    /// Invitation cancelled before it resolved
    InviteCancelled,
    /// Meeting started
    MeetingStarted,
    /// Meeting ended
    MeetingEnded,
}

/// Entry in the bounded feed history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEntry {
    /// A task event
    Task(TaskEvent),
    /// A social pseudo-event
    Social {
        /// What happened
        kind: SocialKind,
        /// Agents involved
        agents: Vec<AgentId>,
        /// Simulated time of the event
        at: SimTime,
    },
}

/// Read-only display feed with the de-duplication set behind it
#[derive(Debug, Clone)]
pub struct Feed {
    seen: HashSet<String>,
    latest_by_task: HashMap<String, TaskEvent>,
    history: VecDeque<FeedEntry>,
    capacity: usize,
    last_timestamp: Option<String>,
}

impl Feed {
    /// Create a feed keeping at most `capacity` history entries
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            latest_by_task: HashMap::new(),
            history: VecDeque::with_capacity(capacity),
            capacity,
            last_timestamp: None,
        }
    }

    /// Mark an event id as seen. Returns false for a repeat. Empty ids are
    /// never de-duplicated.
    pub fn mark_seen(&mut self, event_id: &str) -> bool {
        if event_id.is_empty() {
            return true;
        }
        self.seen.insert(event_id.to_string())
    }

    /// Record a task event: upsert the per-task view and append to history
    pub fn record_task(&mut self, event: &TaskEvent) {
        if self
            .last_timestamp
            .as_deref()
            .is_none_or(|last| event.timestamp.as_str() > last)
        {
            self.last_timestamp = Some(event.timestamp.clone());
        }

        let newer = self
            .latest_by_task
            .get(&event.task_id)
            .is_none_or(|existing| event.timestamp >= existing.timestamp);
        if newer {
            self.latest_by_task.insert(event.task_id.clone(), event.clone());
        }
        self.push(FeedEntry::Task(event.clone()));
    }

    /// Record a social pseudo-event
    pub fn record_social(&mut self, kind: SocialKind, agents: Vec<AgentId>, at: SimTime) {
        self.push(FeedEntry::Social { kind, agents, at });
    }

    /// Bounded history, oldest first
    pub fn history(&self) -> impl Iterator<Item = &FeedEntry> {
        self.history.iter()
    }

    /// Latest event per task, newest first, at most `limit`
    pub fn recent_tasks(&self, limit: usize) -> Vec<&TaskEvent> {
        let mut items: Vec<&TaskEvent> = self.latest_by_task.values().collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items.truncate(limit);
        items
    }

    /// Every retained task event strictly newer than `since`, oldest first.
    /// Events sharing a timestamp keep their arrival order.
    pub fn since(&self, since: &str) -> Vec<&TaskEvent> {
        let mut items: Vec<&TaskEvent> = self
            .history
            .iter()
            .filter_map(|entry| match entry {
                FeedEntry::Task(event) if event.timestamp.as_str() > since => Some(event),
                _ => None,
            })
            .collect();
        items.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        items
    }

    /// Newest timestamp recorded so far
    pub fn last_timestamp(&self) -> Option<&str> {
        self.last_timestamp.as_deref()
    }

    /// Number of distinct tasks tracked
    pub fn task_count(&self) -> usize {
        self.latest_by_task.len()
    }

    fn push(&mut self, entry: FeedEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(entry);
    }
}
