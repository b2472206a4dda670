//! Meeting scheduler
//!
//! Periodically gathers a small group of idle agents in the conference room.
//! At most one meeting runs at a time.

use tracing::{debug, info};

use super::Office;
use super::agent::{Activity, AgentId};
use super::events::SocialKind;
use super::geometry::Zone;
use super::random::RandomSource;
use super::scheduler::TimerKind;

/// Meeting flag and current membership
#[derive(Debug, Clone, Default)]
pub struct MeetingState {
    in_progress: bool,
    current: u64,
    members: Vec<AgentId>,
}

impl MeetingState {
    /// Whether a meeting is running
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Agents called into the running (or last) meeting
    pub fn members(&self) -> &[AgentId] {
        &self.members
    }

    /// Sequence number of the running (or last) meeting
    pub fn id(&self) -> u64 {
        self.current
    }
}

impl Office {
    /// Arm the periodic check unless one is already pending.
    pub(super) fn schedule_meeting_check(&mut self) {
        if self.timers.find(|k| matches!(k, TimerKind::MeetingCheck)).is_some() {
            return;
        }
        let delay = self.config.meeting_interval_ms.sample(self.rng.as_mut());
        self.timers.schedule(self.now + delay, TimerKind::MeetingCheck);
    }

    /// Run a meeting check now instead of waiting for the timer.
    ///
    /// Returns whether a meeting started.
    pub fn trigger_meeting_check(&mut self) -> bool {
        self.run_meeting_check()
    }

    pub(super) fn run_meeting_check(&mut self) -> bool {
        if self.meeting.in_progress {
            debug!("meeting already running, checking later");
            self.schedule_meeting_check();
            return false;
        }

        let mut available: Vec<usize> = (0..self.agents.len())
            .filter(|&i| {
                let agent = &self.agents[i];
                !agent.state.is_task() && agent.activity != Activity::Meeting
            })
            .collect();
        let seats = self.layout.pool(Zone::Meeting).len();
        let max = self
            .config
            .meeting_max_group
            .min(available.len())
            .min(seats);
        if max < 2 {
            debug!(available = available.len(), "not enough agents for a meeting");
            self.schedule_meeting_check();
            return false;
        }

        let size = 2 + self.rng.index(max - 1);
        for k in 0..size {
            let pick = k + self.rng.index(available.len() - k);
            available.swap(k, pick);
        }
        available.truncate(size);

        self.meeting.in_progress = true;
        self.meeting.current += 1;
        self.meeting.members = available.iter().map(|&i| self.agents[i].id.clone()).collect();
        let now = self.now;

        for (slot, &i) in available.iter().enumerate() {
            self.cancel_activity(i);
            let id = self.agents[i].id.clone();
            let seats = self.layout.pool(Zone::Meeting);
            let seat = match self.spots.reserve(Zone::Meeting, seats, &id, Some(slot)) {
                Some(grant) => {
                    self.agents[i].reserved = Some(grant.key);
                    grant.spot
                }
                None => self.fallback_point(Zone::Meeting),
            };
            self.go_to(i, seat, Activity::Meeting, None);
            self.agents[i].say("To the meeting room.", now, 1_800);
        }

        let duration = self.config.meeting_duration_ms.sample(self.rng.as_mut());
        self.timers.schedule(
            now + duration,
            TimerKind::MeetingEnd {
                meeting: self.meeting.current,
            },
        );
        info!(
            meeting = self.meeting.current,
            members = ?self.meeting.members,
            duration_ms = duration,
            "meeting started"
        );
        self.feed.record_social(SocialKind::MeetingStarted, self.meeting.members.clone(), now);
        true
    }

    pub(super) fn end_meeting(&mut self, meeting: u64) {
        if !self.meeting.in_progress || meeting != self.meeting.current {
            return;
        }
        self.meeting.in_progress = false;

        let members = self.meeting.members.clone();
        for id in &members {
            let Some(i) = self.index_of(id) else { continue };
            let agent = &self.agents[i];
            if agent.activity == Activity::Meeting && !agent.state.is_task() {
                self.release_spot(i);
                self.return_to_idle(i);
            }
        }

        info!(meeting, "meeting ended");
        self.feed.record_social(SocialKind::MeetingEnded, members, self.now);
        self.schedule_meeting_check();
    }
}
