//! Ingestion adapter: raw webhook payloads to [`TaskEvent`]s
//!
//! Producers (chat bots, schedulers, CI hooks) send loosely-shaped JSON. The
//! adapter maps agent aliases, source tags and status keywords onto the
//! office vocabulary and fills in missing ids, titles and timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::Office;
use super::agent::AgentId;
use super::error::Result;
use super::events::{EventOutcome, TaskEvent, TaskStatus};

/// Longest title kept, in characters
pub const MAX_TITLE_CHARS: usize = 120;

const DEFAULT_TITLE: &str = "Incoming task";

/// Payload as producers send it; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTaskEvent {
    /// Event id
    pub event_id: Option<String>,
    /// Task id
    pub task_id: Option<String>,
    /// Agent id or alias
    pub agent_id: Option<String>,
    /// Status keyword
    pub status: Option<String>,
    /// Origin tag
    pub source: Option<String>,
    /// Display title
    pub title: Option<String>,
    /// ISO-8601 timestamp
    pub timestamp: Option<String>,
    /// Producer-specific extras, carried but unused
    pub meta: serde_json::Value,
}

/// Parse one JSON payload
pub fn parse_line(line: &str) -> Result<RawTaskEvent> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Map an agent id or alias onto the roster
pub fn normalize_agent(raw: &str) -> Option<AgentId> {
    let v = raw.to_lowercase();
    let id = if v.contains("orchestrator") || v.contains("main") || v.contains("ekrem") {
        "main"
    } else if v.contains("coder") || v.contains("mithat") {
        "coder"
    } else if v.contains("marketer") || v.contains("fikret") {
        "marketer"
    } else if v.contains("daily") || v.contains("pelin") {
        "daily"
    } else if v.contains("kalshi") || v.contains("investor") || v.contains("mehmet") {
        "kalshi"
    } else {
        return None;
    };
    Some(AgentId::from(id))
}

/// Collapse a source tag to `slack`, `telegram` or `openclaw`
pub fn normalize_source(raw: Option<&str>) -> &'static str {
    let v = raw.unwrap_or_default().to_lowercase();
    if v.contains("slack") {
        "slack"
    } else if v.contains("telegram") {
        "telegram"
    } else {
        "openclaw"
    }
}

/// Map a status keyword onto a lifecycle status
pub fn normalize_status(raw: &str) -> Option<TaskStatus> {
    let v = raw.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| v.contains(w));
    if has(&["start", "progress", "run"]) {
        Some(TaskStatus::Started)
    } else if has(&["done", "success", "complete"]) {
        Some(TaskStatus::Done)
    } else if has(&["fail", "error", "block"]) {
        Some(TaskStatus::Failed)
    } else if has(&["assign", "new", "queue", "todo", "open"]) {
        Some(TaskStatus::Assigned)
    } else {
        None
    }
}

/// Why a raw payload did not become an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A required field is absent or empty
    Missing(&'static str),
    /// Agent id matches no roster alias
    UnknownAgent(String),
    /// Status keyword not recognized
    UnknownStatus(String),
}

impl Rejection {
    /// Outcome reported for the rejected payload
    pub fn outcome(&self) -> EventOutcome {
        match self {
            Rejection::UnknownAgent(_) => EventOutcome::UnknownAgent,
            Rejection::Missing(_) | Rejection::UnknownStatus(_) => EventOutcome::Invalid,
        }
    }
}

/// Raw payload normalizer
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestAdapter {
    /// Follow every assignment with a synthetic "started" event
    pub auto_start: bool,
}

impl IngestAdapter {
    /// Create an adapter
    pub fn new(auto_start: bool) -> Self {
        Self { auto_start }
    }

    /// Normalize one payload; `now` stamps events that carry no timestamp.
    pub fn normalize(
        &self,
        raw: &RawTaskEvent,
        now: DateTime<Utc>,
    ) -> std::result::Result<TaskEvent, Rejection> {
        let agent = non_empty(&raw.agent_id).ok_or(Rejection::Missing("agentId"))?;
        let agent_id =
            normalize_agent(&agent).ok_or_else(|| Rejection::UnknownAgent(agent.clone()))?;
        let status = non_empty(&raw.status).ok_or(Rejection::Missing("status"))?;
        let status =
            normalize_status(&status).ok_or_else(|| Rejection::UnknownStatus(status.clone()))?;

        let title: String = raw
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .chars()
            .take(MAX_TITLE_CHARS)
            .collect();

        Ok(TaskEvent {
            event_id: non_empty(&raw.event_id).unwrap_or_else(|| Uuid::new_v4().to_string()),
            task_id: non_empty(&raw.task_id)
                .unwrap_or_else(|| format!("task-{}", Uuid::new_v4().simple())),
            agent_id,
            status,
            source: normalize_source(raw.source.as_deref()).to_string(),
            title,
            timestamp: non_empty(&raw.timestamp)
                .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        })
    }

    /// Normalize and, in auto-start mode, append the follow-up "started"
    /// event for an assignment.
    pub fn expand(
        &self,
        raw: &RawTaskEvent,
        now: DateTime<Utc>,
    ) -> std::result::Result<Vec<TaskEvent>, Rejection> {
        let event = self.normalize(raw, now)?;
        let mut events = Vec::with_capacity(2);
        if self.auto_start && event.status == TaskStatus::Assigned {
            let started = TaskEvent {
                event_id: format!("{}-s", event.event_id),
                status: TaskStatus::Started,
                ..event.clone()
            };
            events.push(event);
            events.push(started);
        } else {
            events.push(event);
        }
        Ok(events)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl Office {
    /// Normalize a raw payload and apply the resulting event(s)
    pub fn ingest(&mut self, raw: &RawTaskEvent) -> Vec<EventOutcome> {
        let adapter = IngestAdapter::new(self.config.auto_start);
        match adapter.expand(raw, self.wall_clock()) {
            Ok(events) => events.into_iter().map(|e| self.apply_event(e)).collect(),
            Err(rejection) => {
                debug!(?rejection, "raw event rejected");
                vec![rejection.outcome()]
            }
        }
    }

    /// Parse and ingest one JSON line
    pub fn ingest_line(&mut self, line: &str) -> Result<Vec<EventOutcome>> {
        let raw = parse_line(line)?;
        Ok(self.ingest(&raw))
    }
}
