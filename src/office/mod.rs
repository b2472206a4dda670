//! Simulation root and public API
//!
//! [`Office`] owns every piece of mutable simulation state: the agents, the
//! spot registry, the timer queue, the meeting flag and the event feed. Nothing
//! lives in statics, so several offices can run side by side.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// Submodules
pub mod agent;
pub mod behavior;
pub mod demo;
pub mod error;
pub mod events;
pub mod geometry;
pub mod ingest;
pub mod meeting;
pub mod random;
pub mod reservation;
pub mod router;
pub mod scheduler;
pub mod snapshot;
pub mod social;
pub mod steering;
pub mod storage;

use agent::{Agent, AgentId, ROSTER};
use error::{OfficeError, Result};
use events::Feed;
use geometry::Layout;
use meeting::MeetingState;
use random::{RandomSource, SeededRandom};
use reservation::SpotRegistry;
use scheduler::{SimTime, TimerKind, TimerQueue};
use steering::Steering;

/// Inclusive millisecond window a duration is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Lower bound
    pub min: u64,
    /// Upper bound
    pub max: u64,
}

impl Window {
    /// Create a new window
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Draw a duration from the window
    pub fn sample(&self, rng: &mut dyn RandomSource) -> u64 {
        rng.duration(self.min, self.max)
    }
}

/// Configuration for an office simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficeConfig {
    /// Simulated milliseconds per tick
    pub frame_ms: u64,

    /// Seed for the random source (entropy when absent)
    pub seed: Option<u64>,

    /// Wall-clock instant simulated time zero maps to (creation time when absent)
    pub epoch: Option<DateTime<Utc>>,

    /// Slowest agent speed, pixels per tick
    pub speed_min: f64,

    /// Fastest agent speed, pixels per tick
    pub speed_max: f64,

    /// Initial desk dwell before the first activity roll
    pub initial_dwell_ms: Window,

    /// Desk dwell after returning to the desk
    pub desk_dwell_ms: Window,

    /// Stationary chat dwell
    pub chat_ms: Window,

    /// Dwell at the kitchen or lounge
    pub amenity_dwell_ms: Window,

    /// Dwell at a corridor spot
    pub corridor_dwell_ms: Window,

    /// Dwell at the game table
    pub game_dwell_ms: Window,

    /// Acknowledgement dwell after an assignment
    pub notify_ms: u64,

    /// Working duration before a completion is synthesized
    pub work_ms: Window,

    /// Dwell in the done state
    pub done_ms: u64,

    /// Dwell in the failed state
    pub failed_ms: u64,

    /// Delay between a game invite and its resolution
    pub invite_delay_ms: u64,

    /// Probability an invite is accepted
    pub invite_accept_probability: f64,

    /// Max distance to a game partner
    pub invite_radius: f64,

    /// Time between meeting checks
    pub meeting_interval_ms: Window,

    /// Meeting length
    pub meeting_duration_ms: Window,

    /// Largest meeting group
    pub meeting_max_group: usize,

    /// Local repulsion parameters
    pub steering: Steering,

    /// Notification pulse decay per tick
    pub pulse_decay: f64,

    /// Bounded feed history length
    pub feed_capacity: usize,

    /// Ingestion emits a "started" event after every "assigned" one
    pub auto_start: bool,
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            frame_ms: 16,
            seed: None,
            epoch: None,
            speed_min: 1.3,
            speed_max: 1.5,
            initial_dwell_ms: Window::new(3_000, 7_000),
            desk_dwell_ms: Window::new(5_000, 10_000),
            chat_ms: Window::new(1_600, 3_000),
            amenity_dwell_ms: Window::new(4_000, 7_000),
            corridor_dwell_ms: Window::new(2_500, 4_000),
            game_dwell_ms: Window::new(6_000, 9_000),
            notify_ms: 850,
            work_ms: Window::new(2_200, 4_700),
            done_ms: 1_400,
            failed_ms: 1_600,
            invite_delay_ms: 1_500,
            invite_accept_probability: 0.7,
            invite_radius: 300.0,
            meeting_interval_ms: Window::new(45_000, 90_000),
            meeting_duration_ms: Window::new(12_000, 20_000),
            meeting_max_group: 4,
            steering: Steering::default(),
            pulse_decay: 0.009,
            feed_capacity: 50,
            auto_start: false,
        }
    }
}

impl OfficeConfig {
    /// Reject configurations the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.frame_ms == 0 {
            return Err(OfficeError::Config("frame_ms must be positive".into()));
        }
        if !(self.speed_min > 0.0 && self.speed_min <= self.speed_max) {
            return Err(OfficeError::Config(format!(
                "speed range [{}, {}] is invalid",
                self.speed_min, self.speed_max
            )));
        }
        let windows = [
            ("initial_dwell_ms", self.initial_dwell_ms),
            ("desk_dwell_ms", self.desk_dwell_ms),
            ("chat_ms", self.chat_ms),
            ("amenity_dwell_ms", self.amenity_dwell_ms),
            ("corridor_dwell_ms", self.corridor_dwell_ms),
            ("game_dwell_ms", self.game_dwell_ms),
            ("work_ms", self.work_ms),
            ("meeting_interval_ms", self.meeting_interval_ms),
            ("meeting_duration_ms", self.meeting_duration_ms),
        ];
        if let Some((name, w)) = windows.iter().find(|(_, w)| w.min > w.max) {
            return Err(OfficeError::Config(format!(
                "{name}: min {} exceeds max {}",
                w.min, w.max
            )));
        }
        if !(0.0..=1.0).contains(&self.invite_accept_probability) {
            return Err(OfficeError::Config(
                "invite_accept_probability must be within [0, 1]".into(),
            ));
        }
        if self.meeting_max_group < 2 {
            return Err(OfficeError::Config(
                "meeting_max_group must be at least 2".into(),
            ));
        }
        if self.invite_radius < 0.0 || self.steering.radius < 0.0 {
            return Err(OfficeError::Config("radii must be non-negative".into()));
        }
        Ok(())
    }
}

/// The office simulation
pub struct Office {
    config: OfficeConfig,
    layout: Layout,
    agents: Vec<Agent>,
    spots: SpotRegistry,
    timers: TimerQueue,
    meeting: MeetingState,
    feed: Feed,
    rng: Box<dyn RandomSource>,
    now: SimTime,
    epoch: DateTime<Utc>,
}

impl Office {
    /// Create an office with the configured seed (or entropy)
    pub fn new(config: OfficeConfig) -> Result<Self> {
        let rng: Box<dyn RandomSource> = match config.seed {
            Some(seed) => Box::new(SeededRandom::from_seed(seed)),
            None => Box::new(SeededRandom::from_entropy()),
        };
        Self::with_random(config, rng)
    }

    /// Create an office drawing randomness from `rng`
    pub fn with_random(config: OfficeConfig, mut rng: Box<dyn RandomSource>) -> Result<Self> {
        config.validate()?;

        let layout = Layout::standard();
        let agents = ROSTER
            .iter()
            .map(|def| {
                let speed = rng.range(config.speed_min, config.speed_max);
                let dwell = config.initial_dwell_ms.sample(rng.as_mut());
                Agent::from_def(def, &layout, speed, SimTime::ZERO + dwell)
            })
            .collect();

        let epoch = config.epoch.unwrap_or_else(Utc::now);
        let feed = Feed::new(config.feed_capacity);

        let mut office = Self {
            config,
            layout,
            agents,
            spots: SpotRegistry::new(),
            timers: TimerQueue::new(),
            meeting: MeetingState::default(),
            feed,
            rng,
            now: SimTime::ZERO,
            epoch,
        };
        office.schedule_meeting_check();
        Ok(office)
    }

    /// Advance the simulation by one frame
    pub fn tick(&mut self) {
        self.now = self.now + self.config.frame_ms;

        while let Some(timer) = self.timers.pop_due(self.now) {
            tracing::trace!(at = %timer.fire_at, kind = ?timer.kind, "timer fired");
            match timer.kind {
                TimerKind::InviteResolution {
                    initiator,
                    initiator_token,
                    invitee,
                    invitee_token,
                } => self.resolve_invite(&initiator, initiator_token, &invitee, invitee_token),
                TimerKind::MeetingCheck => {
                    self.run_meeting_check();
                }
                TimerKind::MeetingEnd { meeting } => self.end_meeting(meeting),
            }
        }

        for i in 0..self.agents.len() {
            self.step_agent(i);
        }
    }

    /// Tick until at least `ms` simulated milliseconds have passed
    pub fn run_for(&mut self, ms: u64) {
        let until = self.now + ms;
        while self.now < until {
            self.tick();
        }
    }

    /// Tick until `pred` holds or `max_ms` have passed; returns whether it held
    pub fn run_until(&mut self, max_ms: u64, mut pred: impl FnMut(&Office) -> bool) -> bool {
        let until = self.now + max_ms;
        while !pred(self) {
            if self.now >= until {
                return false;
            }
            self.tick();
        }
        true
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Configuration in use
    pub fn config(&self) -> &OfficeConfig {
        &self.config
    }

    /// Static floor plan
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// All agents in roster order
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Look up an agent
    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id.as_str() == id)
    }

    /// The spot registry
    pub fn spots(&self) -> &SpotRegistry {
        &self.spots
    }

    /// The event feed
    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    /// Meeting scheduler state
    pub fn meeting(&self) -> &MeetingState {
        &self.meeting
    }

    /// Whether a meeting is running
    pub fn meeting_in_progress(&self) -> bool {
        self.meeting.in_progress()
    }

    /// When the next meeting check fires, if one is scheduled
    pub fn next_meeting_check(&self) -> Option<SimTime> {
        self.timers.find(|k| matches!(k, TimerKind::MeetingCheck))
    }

    /// Number of pending timer continuations
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Wall-clock instant for the current simulated time
    pub fn wall_clock(&self) -> DateTime<Utc> {
        self.epoch + Duration::milliseconds(self.now.as_millis() as i64)
    }

    /// ISO-8601 timestamp for the current simulated time
    pub fn timestamp(&self) -> String {
        self.wall_clock().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub(crate) fn index_of(&self, id: &AgentId) -> Option<usize> {
        self.agents.iter().position(|a| &a.id == id)
    }
}

// Re-export commonly used types
pub use agent::{Activity, AgentState};
pub use events::{EventOutcome, TaskEvent, TaskStatus};
pub use geometry::Point;
