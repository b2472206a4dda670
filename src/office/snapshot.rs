//! Read-only views for renderers and status panels

use serde::{Deserialize, Serialize};

use super::Office;
use super::agent::{Activity, AgentState, Bubble};
use super::scheduler::SimTime;

/// One agent as a renderer sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Roster id
    pub id: String,
    /// Display name
    pub name: String,
    /// Role label
    pub role: String,
    /// Sprite color
    pub color: String,
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// State-machine value
    pub state: AgentState,
    /// Human-readable state
    pub state_label: String,
    /// Descriptive activity
    pub activity: Activity,
    /// Visible speech bubble with its expiry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bubble: Option<Bubble>,
    /// Notification ring intensity in `[0, 1]`
    pub pulse: f64,
    /// Notification ring color
    pub notify_color: String,
}

/// One row of the status panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    /// Roster id
    pub id: String,
    /// Display name
    pub name: String,
    /// Role label
    pub role: String,
    /// Human-readable state
    pub state: String,
    /// Activity label
    pub activity: String,
    /// Title of the task being handled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Tasks waiting behind it
    pub queued: usize,
}

/// Whole-office frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeSnapshot {
    /// Simulated time of the frame
    pub at: SimTime,
    /// Whether a meeting is running
    pub meeting_in_progress: bool,
    /// Agents in roster order
    pub agents: Vec<AgentSnapshot>,
}

impl Office {
    /// Capture positions, states and visible bubbles
    pub fn snapshot(&self) -> OfficeSnapshot {
        let now = self.now;
        let agents = self
            .agents
            .iter()
            .map(|a| AgentSnapshot {
                id: a.id.to_string(),
                name: a.name.clone(),
                role: a.role.label().to_string(),
                color: a.color.clone(),
                x: a.pos.x,
                y: a.pos.y,
                state: a.state,
                state_label: a.state.label().to_string(),
                activity: a.activity,
                bubble: a.bubble.clone().filter(|b| b.until > now),
                pulse: a.pulse,
                notify_color: a.notify_color.clone(),
            })
            .collect();

        OfficeSnapshot {
            at: now,
            meeting_in_progress: self.meeting.in_progress(),
            agents,
        }
    }

    /// Status-panel rows in roster order
    pub fn status(&self) -> Vec<StatusRow> {
        self.agents
            .iter()
            .map(|a| StatusRow {
                id: a.id.to_string(),
                name: a.name.clone(),
                role: a.role.label().to_string(),
                state: a.state.label().to_string(),
                activity: a.activity.label().to_string(),
                task: a.current_task.as_ref().map(|t| t.title.clone()),
                queued: a.queue.len(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::office::OfficeConfig;
    use crate::office::random::ScriptedRandom;

    #[test]
    fn test_snapshot_lists_roster_in_order() {
        let office =
            Office::with_random(OfficeConfig::default(), Box::new(ScriptedRandom::constant(0.0)))
                .unwrap();
        let snap = office.snapshot();
        let ids: Vec<_> = snap.agents.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["main", "coder", "marketer", "daily", "kalshi"]);
        assert!(snap.agents.iter().all(|a| a.state_label == "At Desk"));

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["agents"][1]["state"], "idle_desk");
        assert!(json["agents"][1].get("bubble").is_none());
    }

    #[test]
    fn test_snapshot_carries_bubble_expiry() {
        let mut office =
            Office::with_random(OfficeConfig::default(), Box::new(ScriptedRandom::constant(0.0)))
                .unwrap();
        office.tick();
        let outcome = office.apply_event(crate::office::TaskEvent {
            event_id: "e1".into(),
            task_id: "t1".into(),
            agent_id: "coder".into(),
            status: crate::office::TaskStatus::Assigned,
            source: "telegram".into(),
            title: "Ship it".into(),
            timestamp: "2026-10-15T10:00:00.000Z".into(),
        });
        assert_eq!(outcome, crate::office::EventOutcome::Applied);

        let snap = office.snapshot();
        let bubble = snap.agents[1].bubble.as_ref().unwrap();
        assert_eq!(bubble.text, "telegram: Ship it");
        assert_eq!(bubble.until, office.now() + 1_700);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["agents"][1]["bubble"]["until"], 1_700 + office.now().as_millis());
    }

    #[test]
    fn test_status_rows() {
        let office =
            Office::with_random(OfficeConfig::default(), Box::new(ScriptedRandom::constant(0.0)))
                .unwrap();
        let rows = office.status();
        assert_eq!(rows[3].name, "Pelin");
        assert_eq!(rows[3].activity, "desk");
        assert_eq!(rows[3].queued, 0);
        assert!(rows[3].task.is_none());
    }
}
