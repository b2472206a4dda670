//! Agent data: identity, state-machine values, activity tags and the roster

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::events::TaskEvent;
use super::geometry::{Layout, Point};
use super::reservation::SpotKey;
use super::scheduler::SimTime;

/// Agent identifier (roster slug such as `coder`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Formal per-agent state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Sitting at the desk between activities
    IdleDesk,
    /// Walking to, or lingering at, an idle destination
    IdleWander,
    /// Stationary conversation
    IdleChat,
    /// Acknowledging a freshly assigned task
    TaskNotified,
    /// Walking to the desk to work a task
    TaskCommute,
    /// Working at the desk
    TaskWorking,
    /// Task completed, showing the result
    TaskDone,
    /// Task failed, showing the result
    TaskFailed,
}

impl AgentState {
    /// Whether this is one of the task states
    pub fn is_task(&self) -> bool {
        matches!(
            self,
            AgentState::TaskNotified
                | AgentState::TaskCommute
                | AgentState::TaskWorking
                | AgentState::TaskDone
                | AgentState::TaskFailed
        )
    }

    /// Whether this is a terminal task state
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::TaskDone | AgentState::TaskFailed)
    }

    /// Status-panel label
    pub fn label(&self) -> &'static str {
        match self {
            AgentState::IdleDesk => "At Desk",
            AgentState::IdleWander => "Idle",
            AgentState::IdleChat => "Chatting",
            AgentState::TaskNotified => "Notified",
            AgentState::TaskCommute => "Commuting",
            AgentState::TaskWorking => "Working",
            AgentState::TaskDone => "Done",
            AgentState::TaskFailed => "Failed",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Descriptive activity tag, orthogonal to [`AgentState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// At or heading to the desk
    Desk,
    /// Chatting in place
    Chat,
    /// Coffee in the kitchen
    Coffee,
    /// Sitting in the lounge
    Lounge,
    /// Playing ping-pong
    Game,
    /// Strolling the corridor
    Corridor,
    /// In the conference room
    Meeting,
}

impl Activity {
    /// Activities an idle roll can choose, in profile order
    pub const IDLE_CHOICES: [Activity; 6] = [
        Activity::Desk,
        Activity::Chat,
        Activity::Coffee,
        Activity::Lounge,
        Activity::Game,
        Activity::Corridor,
    ];

    /// Status-panel label
    pub fn label(&self) -> &'static str {
        match self {
            Activity::Desk => "desk",
            Activity::Chat => "chat",
            Activity::Coffee => "coffee",
            Activity::Lounge => "lounge",
            Activity::Game => "ping-pong",
            Activity::Corridor => "corridor",
            Activity::Meeting => "meeting",
        }
    }
}

/// Agent role, which selects the idle activity profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Runs the office
    Orchestrator,
    /// Writes code
    Coder,
    /// Runs campaigns
    Marketer,
    /// Keeps the calendar
    Daily,
    /// Watches markets
    Investor,
}

impl Role {
    /// Weights over [`Activity::IDLE_CHOICES`]
    pub fn profile(&self) -> [f64; 6] {
        match self {
            //                      desk  chat  coffee lounge game corridor
            Role::Orchestrator => [0.50, 0.20, 0.10, 0.08, 0.04, 0.08],
            Role::Coder => [0.52, 0.08, 0.16, 0.06, 0.12, 0.06],
            Role::Marketer => [0.40, 0.22, 0.12, 0.12, 0.08, 0.06],
            Role::Daily => [0.45, 0.15, 0.18, 0.08, 0.04, 0.10],
            Role::Investor => [0.55, 0.10, 0.10, 0.10, 0.10, 0.05],
        }
    }

    /// Display name
    pub fn label(&self) -> &'static str {
        match self {
            Role::Orchestrator => "Orchestrator",
            Role::Coder => "Coder",
            Role::Marketer => "Marketer",
            Role::Daily => "Daily",
            Role::Investor => "Investor",
        }
    }
}

/// Static roster entry
#[derive(Debug, Clone, Copy)]
pub struct AgentDef {
    /// Roster id
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Role
    pub role: Role,
    /// Sprite color
    pub color: &'static str,
    /// Idle speech lines
    pub lines: &'static [&'static str],
}

/// The fixed office roster
pub const ROSTER: [AgentDef; 5] = [
    AgentDef {
        id: "main",
        name: "Ekrem",
        role: Role::Orchestrator,
        color: "#f4a261",
        lines: &[
            "Priority: high impact.",
            "Who should take this?",
            "What is the team up to?",
            "Is the plan ready?",
        ],
    },
    AgentDef {
        id: "coder",
        name: "Mithat",
        role: Role::Coder,
        color: "#7bdff2",
        lines: &[
            "Build is green.",
            "These logs look off...",
            "Checking before deploy.",
            "Tests pass.",
        ],
    },
    AgentDef {
        id: "marketer",
        name: "Fikret",
        role: Role::Marketer,
        color: "#ff7faf",
        lines: &[
            "CTR looks good today.",
            "This creative is strong.",
            "Let's check retention.",
            "A/B test is ready.",
        ],
    },
    AgentDef {
        id: "daily",
        name: "Pelin",
        role: Role::Daily,
        color: "#c2f970",
        lines: &[
            "Where are the notes?",
            "I have the calendar, coffee?",
            "On it...",
            "Reminder set.",
        ],
    },
    AgentDef {
        id: "kalshi",
        name: "Mehmet",
        role: Role::Investor,
        color: "#b19cd9",
        lines: &[
            "Volatility is rising.",
            "Risk/reward?",
            "Too early for an entry.",
            "Position opened.",
        ],
    },
];

/// Transient speech bubble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bubble {
    /// Text shown
    pub text: String,
    /// Expiry
    pub until: SimTime,
}

/// Social handshake pointer. An agent is either inviting or invited, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteLink {
    /// This agent proposed to `peer`
    Inviting {
        /// Invited agent
        peer: AgentId,
        /// Own invite token when the handshake began
        token: u64,
    },
    /// This agent was asked by `peer`
    Invited {
        /// Inviting agent
        peer: AgentId,
        /// Own invite token when the handshake began
        token: u64,
    },
}

impl InviteLink {
    /// The other party
    pub fn peer(&self) -> &AgentId {
        match self {
            InviteLink::Inviting { peer, .. } | InviteLink::Invited { peer, .. } => peer,
        }
    }

    /// Token captured at handshake start
    pub fn token(&self) -> u64 {
        match self {
            InviteLink::Inviting { token, .. } | InviteLink::Invited { token, .. } => *token,
        }
    }
}

/// A simulated office worker
#[derive(Debug, Clone)]
pub struct Agent {
    /// Roster id
    pub id: AgentId,
    /// Display name
    pub name: String,
    /// Role
    pub role: Role,
    /// Sprite color
    pub color: String,
    /// Idle speech lines
    pub lines: &'static [&'static str],
    /// Current position, written only by steering
    pub pos: Point,
    /// Home desk
    pub desk: Point,
    /// Max distance per tick
    pub speed: f64,
    /// State-machine value
    pub state: AgentState,
    /// Descriptive activity
    pub activity: Activity,
    /// Pending waypoints after `target`
    pub route: VecDeque<Point>,
    /// Waypoint currently walked toward
    pub target: Option<Point>,
    /// Set by a new route, cleared once its last waypoint is reached
    pub en_route: bool,
    /// Task being handled
    pub current_task: Option<TaskEvent>,
    /// Tasks waiting behind the current one
    pub queue: VecDeque<TaskEvent>,
    /// Held reservation, mirrored from the registry
    pub reserved: Option<SpotKey>,
    /// Bumped whenever an in-flight handshake is cancelled
    pub invite_token: u64,
    /// Handshake pointer
    pub invite: Option<InviteLink>,
    /// When the current state may transition
    pub state_until: SimTime,
    /// Dwell to start counting on arrival
    pub pending_dwell: Option<u64>,
    /// Speech bubble
    pub bubble: Option<Bubble>,
    /// Notification ring intensity, decays to zero
    pub pulse: f64,
    /// Notification ring color
    pub notify_color: String,
}

impl Agent {
    /// Create an agent at its desk
    pub fn from_def(def: &AgentDef, layout: &Layout, speed: f64, state_until: SimTime) -> Self {
        let desk = layout.desk_of(def.id);
        Self {
            id: AgentId::from(def.id),
            name: def.name.to_string(),
            role: def.role,
            color: def.color.to_string(),
            lines: def.lines,
            pos: desk,
            desk,
            speed,
            state: AgentState::IdleDesk,
            activity: Activity::Desk,
            route: VecDeque::new(),
            target: None,
            en_route: false,
            current_task: None,
            queue: VecDeque::new(),
            reserved: None,
            invite_token: 0,
            invite: None,
            state_until,
            pending_dwell: None,
            bubble: None,
            pulse: 0.0,
            notify_color: "#ffd166".to_string(),
        }
    }

    /// Whether the agent still has somewhere to walk
    pub fn is_moving(&self) -> bool {
        self.target.is_some() || !self.route.is_empty()
    }

    /// Available for a game invite or a meeting: idle, not mid-handshake,
    /// not already in a meeting.
    pub fn is_socially_available(&self) -> bool {
        !self.state.is_task() && self.invite.is_none() && self.activity != Activity::Meeting
    }

    /// Replace the route entirely
    pub fn set_route(&mut self, route: Vec<Point>) {
        self.route = route.into();
        self.target = self.route.pop_front();
        self.en_route = true;
    }

    /// Whether the last waypoint of the current route was just reached
    pub fn has_arrived(&self) -> bool {
        self.en_route && !self.is_moving()
    }

    /// Drop any pending movement
    pub fn clear_route(&mut self) {
        self.route.clear();
        self.target = None;
        self.en_route = false;
    }

    /// Show a speech bubble
    pub fn say(&mut self, text: impl Into<String>, now: SimTime, ms: u64) {
        self.bubble = Some(Bubble {
            text: text.into(),
            until: now + ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_are_normalized() {
        for def in ROSTER {
            let total: f64 = def.role.profile().iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "{} sums to {}", def.id, total);
        }
    }

    #[test]
    fn test_agent_starts_idle_at_desk() {
        let layout = Layout::standard();
        let agent = Agent::from_def(&ROSTER[1], &layout, 1.4, SimTime(3000));
        assert_eq!(agent.pos, agent.desk);
        assert_eq!(agent.state, AgentState::IdleDesk);
        assert!(agent.current_task.is_none());
        assert!(agent.is_socially_available());
    }

    #[test]
    fn test_set_route_drains_front_first() {
        let layout = Layout::standard();
        let mut agent = Agent::from_def(&ROSTER[0], &layout, 1.4, SimTime::ZERO);
        agent.set_route(vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)]);
        assert_eq!(agent.target, Some(Point::new(1.0, 1.0)));
        assert_eq!(agent.route.len(), 1);
        agent.clear_route();
        assert!(!agent.is_moving());
        assert!(!agent.has_arrived());
    }

    #[test]
    fn test_empty_route_counts_as_arrival() {
        let layout = Layout::standard();
        let mut agent = Agent::from_def(&ROSTER[0], &layout, 1.4, SimTime::ZERO);
        agent.set_route(Vec::new());
        assert!(agent.has_arrived());
    }
}
