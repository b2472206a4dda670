//! Per-agent behavior state machine
//!
//! Idle cycle, task lifecycle and the shared helpers (cancel, go-to, return to
//! desk) the social protocol and meeting scheduler build on.

use tracing::debug;
use uuid::Uuid;

use super::Office;
use super::agent::{Activity, AgentId, AgentState};
use super::error::{OfficeError, Result};
use super::events::{EventOutcome, TaskEvent, TaskStatus, source_color};
use super::geometry::{Point, Zone};
use super::random::RandomSource;
use super::router::{ROUTE_EPSILON, build_route};
use super::scheduler::SimTime;

const BUBBLE_MS: u64 = 2_200;
const TITLE_BUBBLE_CHARS: usize = 22;
const FALLBACK_JITTER: f64 = 20.0;

impl Office {
    /// Feed a task event into the state machines.
    ///
    /// Invalid, duplicate and unknown-agent events are dropped without touching
    /// any agent; the returned outcome says what happened.
    pub fn apply_event(&mut self, event: TaskEvent) -> EventOutcome {
        if event.agent_id.as_str().is_empty() || event.task_id.is_empty() {
            debug!(event_id = %event.event_id, "dropping event without agent or task id");
            return EventOutcome::Invalid;
        }
        let Some(i) = self.index_of(&event.agent_id) else {
            debug!(agent = %event.agent_id, "dropping event for unknown agent");
            return EventOutcome::UnknownAgent;
        };
        if !self.feed.mark_seen(&event.event_id) {
            debug!(event_id = %event.event_id, "dropping duplicate event");
            return EventOutcome::Duplicate;
        }
        self.feed.record_task(&event);

        let outcome = match event.status {
            TaskStatus::Assigned => self.assign_task(i, event),
            TaskStatus::Started => self.start_task(i, event),
            TaskStatus::Done | TaskStatus::Failed => self.resolve_task(i, event),
        };
        let agent = &self.agents[i];
        debug!(agent = %agent.id, state = ?agent.state, ?outcome, "task event applied");
        outcome
    }

    /// Start an idle activity right away, bypassing the weighted roll.
    ///
    /// Returns `Ok(false)` when the agent is busy (task, handshake or meeting).
    pub fn begin_activity(&mut self, agent: &str, activity: Activity) -> Result<bool> {
        let i = self
            .index_of(&AgentId::from(agent))
            .ok_or_else(|| OfficeError::UnknownAgent(agent.to_string()))?;
        if activity == Activity::Meeting || !self.agents[i].is_socially_available() {
            return Ok(false);
        }
        self.release_spot(i);
        self.begin(i, activity);
        Ok(true)
    }

    pub(super) fn step_agent(&mut self, i: usize) {
        let now = self.now;
        let decay = self.config.pulse_decay;
        {
            let agent = &mut self.agents[i];
            if agent.pulse > 0.0 {
                agent.pulse = (agent.pulse - decay).max(0.0);
            }
            if agent.bubble.as_ref().is_some_and(|b| b.until <= now) {
                agent.bubble = None;
            }
        }

        if matches!(
            self.agents[i].state,
            AgentState::IdleWander | AgentState::TaskCommute
        ) {
            self.move_agent(i);
        }

        let agent = &self.agents[i];
        let expired = now >= agent.state_until;
        let arrived = agent.has_arrived();
        let moving = agent.is_moving();
        let linked = agent.invite.is_some();
        let state = agent.state;
        match state {
            AgentState::TaskNotified if expired => self.begin_commute(i),
            AgentState::TaskCommute if arrived => self.start_working(i),
            AgentState::TaskWorking if expired => self.synthesize_done(i),
            AgentState::TaskDone | AgentState::TaskFailed if expired => self.finish_task(i),
            AgentState::IdleDesk if expired => self.select_activity(i),
            AgentState::IdleWander if arrived => self.arrive(i),
            AgentState::IdleWander if expired && !moving => self.select_activity(i),
            AgentState::IdleChat if expired && !linked => self.select_activity(i),
            _ => {}
        }
    }

    /// Walk one step along the route. Intermediate waypoints are consumed as
    /// they are reached.
    fn move_agent(&mut self, i: usize) {
        if self.agents[i].target.is_none() {
            let agent = &mut self.agents[i];
            agent.target = agent.route.pop_front();
        }
        let Some(target) = self.agents[i].target else {
            return;
        };

        let neighbors: Vec<Point> = self
            .agents
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, a)| a.pos)
            .collect();

        let steering = self.config.steering;
        let agent = &mut self.agents[i];
        if steering.advance(&mut agent.pos, target, agent.speed, &neighbors) {
            agent.target = agent.route.pop_front();
        }
    }

    // ---------------------------------------------------------------------
    // Idle cycle
    // ---------------------------------------------------------------------

    pub(super) fn select_activity(&mut self, i: usize) {
        self.release_spot(i);
        let weights = self.agents[i].role.profile();
        let choice = weighted_index(self.rng.as_mut(), &weights);
        self.begin(i, Activity::IDLE_CHOICES[choice]);
    }

    fn begin(&mut self, i: usize, activity: Activity) {
        let now = self.now;
        debug!(agent = %self.agents[i].id, activity = activity.label(), "activity selected");
        match activity {
            Activity::Desk => self.return_to_idle(i),
            Activity::Chat => {
                let chat = self.config.chat_ms.sample(self.rng.as_mut());
                let line = self.random_line(i);
                let agent = &mut self.agents[i];
                agent.clear_route();
                agent.pending_dwell = None;
                agent.state = AgentState::IdleChat;
                agent.activity = Activity::Chat;
                agent.state_until = now + chat;
                if let Some(line) = line {
                    agent.say(line, now, BUBBLE_MS);
                }
            }
            Activity::Coffee => {
                let dwell = self.config.amenity_dwell_ms.sample(self.rng.as_mut());
                self.visit_zone(i, Zone::Kitchen, Activity::Coffee, dwell);
            }
            Activity::Lounge => {
                let dwell = self.config.amenity_dwell_ms.sample(self.rng.as_mut());
                self.visit_zone(i, Zone::Lounge, Activity::Lounge, dwell);
            }
            Activity::Game => self.start_game(i),
            Activity::Corridor => {
                let nodes = self.layout.corridor_nodes();
                let node = nodes[self.rng.index(nodes.len())];
                let dwell = self.config.corridor_dwell_ms.sample(self.rng.as_mut());
                self.go_to(i, node, Activity::Corridor, Some(dwell));
            }
            Activity::Meeting => {}
        }
    }

    /// Reserve a spot in `zone` and walk there; a full zone sends the agent to
    /// an unreserved point near the amenity instead.
    pub(super) fn visit_zone(&mut self, i: usize, zone: Zone, activity: Activity, dwell: u64) {
        self.release_spot(i);
        let pool = self.layout.pool(zone);
        let preferred = Some(self.rng.index(pool.len()));
        let id = self.agents[i].id.clone();
        let dest = match self.spots.reserve(zone, pool, &id, preferred) {
            Some(grant) => {
                self.agents[i].reserved = Some(grant.key);
                grant.spot
            }
            None => {
                debug!(agent = %id, %zone, "zone full, using fallback point");
                self.fallback_point(zone)
            }
        };
        self.go_to(i, dest, activity, Some(dwell));
    }

    pub(super) fn fallback_point(&mut self, zone: Zone) -> Point {
        let center = self.layout.fallback(zone);
        let dx = self.rng.range(-FALLBACK_JITTER, FALLBACK_JITTER);
        let dy = self.rng.range(-FALLBACK_JITTER, FALLBACK_JITTER);
        center + Point::new(dx, dy)
    }

    /// Route to `dest` in `idle_wander`. A dwell, when given, starts on arrival;
    /// without one the agent waits for an outside transition.
    pub(super) fn go_to(&mut self, i: usize, dest: Point, activity: Activity, dwell: Option<u64>) {
        let route = build_route(&self.layout, self.agents[i].pos, dest);
        let agent = &mut self.agents[i];
        agent.set_route(route);
        agent.state = AgentState::IdleWander;
        agent.activity = activity;
        agent.pending_dwell = dwell;
        agent.state_until = SimTime::NEVER;
    }

    fn arrive(&mut self, i: usize) {
        let now = self.now;
        self.agents[i].en_route = false;
        let activity = self.agents[i].activity;
        if activity == Activity::Desk {
            self.transition_to_desk(i);
            return;
        }
        let agent = &mut self.agents[i];
        if activity == Activity::Meeting {
            agent.say("Meeting time.", now, BUBBLE_MS);
        } else if let Some(ms) = agent.pending_dwell.take() {
            agent.state_until = now + ms;
        }
    }

    /// Sit down at the desk for a fresh dwell.
    pub(super) fn transition_to_desk(&mut self, i: usize) {
        let now = self.now;
        let dwell = self.config.desk_dwell_ms.sample(self.rng.as_mut());
        let chatty = self.rng.chance(0.15);
        let line = if chatty { self.random_line(i) } else { None };

        let agent = &mut self.agents[i];
        agent.clear_route();
        agent.pending_dwell = None;
        agent.state = AgentState::IdleDesk;
        agent.activity = Activity::Desk;
        agent.state_until = now + dwell;
        if let Some(line) = line {
            agent.say(line, now, BUBBLE_MS);
        }
    }

    /// Back to the idle cycle: sit down if already at the desk, otherwise
    /// walk there.
    pub(super) fn return_to_idle(&mut self, i: usize) {
        self.release_spot(i);
        let agent = &self.agents[i];
        if agent.pos.distance(agent.desk) < ROUTE_EPSILON {
            self.transition_to_desk(i);
        } else {
            let desk = agent.desk;
            self.go_to(i, desk, Activity::Desk, None);
        }
    }

    /// Abort whatever idle or social activity is in flight: release the spot,
    /// invalidate any pending handshake and stop walking.
    pub(super) fn cancel_activity(&mut self, i: usize) {
        self.release_spot(i);
        let agent = &mut self.agents[i];
        if let Some(link) = agent.invite.take() {
            agent.invite_token += 1;
            debug!(agent = %agent.id, peer = %link.peer(), "handshake cancelled");
        }
        agent.clear_route();
        agent.pending_dwell = None;
    }

    pub(super) fn release_spot(&mut self, i: usize) {
        let agent = &mut self.agents[i];
        self.spots.release(&agent.id);
        agent.reserved = None;
    }

    fn random_line(&mut self, i: usize) -> Option<&'static str> {
        let lines = self.agents[i].lines;
        if lines.is_empty() {
            return None;
        }
        Some(lines[self.rng.index(lines.len())])
    }

    // ---------------------------------------------------------------------
    // Task lifecycle
    // ---------------------------------------------------------------------

    fn assign_task(&mut self, i: usize, event: TaskEvent) -> EventOutcome {
        let agent = &mut self.agents[i];
        if agent
            .current_task
            .as_ref()
            .is_some_and(|t| t.task_id == event.task_id)
            || agent.queue.iter().any(|t| t.task_id == event.task_id)
        {
            return EventOutcome::Ignored;
        }
        if agent.state == AgentState::TaskWorking {
            agent.queue.push_back(event);
            return EventOutcome::Queued;
        }

        self.cancel_activity(i);
        let now = self.now;
        let notify_ms = self.config.notify_ms;
        let agent = &mut self.agents[i];
        if let Some(displaced) = agent.current_task.take() {
            if !agent.state.is_terminal() {
                debug!(agent = %agent.id, task = %displaced.task_id, "requeueing displaced task");
                agent.queue.push_back(displaced);
            }
        }

        let title: String = event.title.chars().take(TITLE_BUBBLE_CHARS).collect();
        let title = if title.is_empty() { "task".to_string() } else { title };
        agent.say(format!("{}: {}", event.source, title), now, 1_700);
        agent.notify_color = source_color(&event.source).to_string();
        agent.pulse = 1.0;
        agent.state = AgentState::TaskNotified;
        agent.activity = Activity::Desk;
        agent.state_until = now + notify_ms;
        agent.current_task = Some(event);
        EventOutcome::Applied
    }

    fn start_task(&mut self, i: usize, event: TaskEvent) -> EventOutcome {
        let agent = &mut self.agents[i];
        let is_current = agent
            .current_task
            .as_ref()
            .is_some_and(|t| t.task_id == event.task_id);

        if is_current {
            if matches!(
                agent.state,
                AgentState::TaskCommute | AgentState::TaskWorking
            ) {
                return EventOutcome::Ignored;
            }
        } else {
            if agent.state == AgentState::TaskWorking {
                if agent.queue.iter().any(|t| t.task_id == event.task_id) {
                    return EventOutcome::Ignored;
                }
                agent.queue.push_back(event);
                return EventOutcome::Queued;
            }
            agent.queue.retain(|t| t.task_id != event.task_id);
            if let Some(displaced) = agent.current_task.take() {
                if !agent.state.is_terminal() {
                    agent.queue.push_back(displaced);
                }
            }
            agent.current_task = Some(event);
        }

        self.cancel_activity(i);
        self.begin_commute(i);
        EventOutcome::Applied
    }

    fn resolve_task(&mut self, i: usize, event: TaskEvent) -> EventOutcome {
        let agent = &mut self.agents[i];
        let is_current = agent
            .current_task
            .as_ref()
            .is_some_and(|t| t.task_id == event.task_id);

        if !is_current {
            if let Some(pos) = agent.queue.iter().position(|t| t.task_id == event.task_id) {
                agent.queue.remove(pos);
                return EventOutcome::Ignored;
            }
            if agent.current_task.is_some() {
                return EventOutcome::Ignored;
            }
        }

        self.cancel_activity(i);
        let now = self.now;
        let (dwell, text, color, state) = match event.status {
            TaskStatus::Failed => (
                self.config.failed_ms,
                "Stuck \u{2717}",
                TaskStatus::Failed.color(),
                AgentState::TaskFailed,
            ),
            _ => (
                self.config.done_ms,
                "Done \u{2713}",
                TaskStatus::Done.color(),
                AgentState::TaskDone,
            ),
        };
        let agent = &mut self.agents[i];
        agent.state = state;
        agent.activity = Activity::Desk;
        agent.notify_color = color.to_string();
        agent.pulse = 1.0;
        agent.say(text, now, dwell);
        agent.state_until = now + dwell;
        agent.current_task = Some(event);
        EventOutcome::Applied
    }

    fn begin_commute(&mut self, i: usize) {
        let desk = self.agents[i].desk;
        let route = build_route(&self.layout, self.agents[i].pos, desk);
        let agent = &mut self.agents[i];
        agent.set_route(route);
        agent.state = AgentState::TaskCommute;
        agent.activity = Activity::Desk;
        agent.state_until = SimTime::NEVER;
    }

    fn start_working(&mut self, i: usize) {
        let now = self.now;
        let work = self.config.work_ms.sample(self.rng.as_mut());
        let agent = &mut self.agents[i];
        agent.en_route = false;
        agent.state = AgentState::TaskWorking;
        agent.state_until = now + work;
        agent.say("Working...", now, 1_300);
    }

    /// Working time is up: report completion through the normal event path.
    fn synthesize_done(&mut self, i: usize) {
        let agent = &self.agents[i];
        let task = agent.current_task.as_ref();
        let event = TaskEvent {
            event_id: format!("auto-{}-{}", agent.id, Uuid::new_v4().simple()),
            task_id: task
                .map(|t| t.task_id.clone())
                .unwrap_or_else(|| format!("task-{}", Uuid::new_v4().simple())),
            agent_id: agent.id.clone(),
            status: TaskStatus::Done,
            source: task
                .map(|t| t.source.clone())
                .unwrap_or_else(|| "openclaw".to_string()),
            title: task
                .map(|t| t.title.clone())
                .unwrap_or_else(|| "Task".to_string()),
            timestamp: self.timestamp(),
        };
        self.apply_event(event);
    }

    /// Terminal dwell expired: drop the task, then take the next queued one or
    /// go back to idling.
    fn finish_task(&mut self, i: usize) {
        let agent = &mut self.agents[i];
        agent.current_task = None;
        match agent.queue.pop_front() {
            Some(next) => {
                debug!(agent = %agent.id, task = %next.task_id, "dequeuing task");
                self.assign_task(i, next);
            }
            None => self.return_to_idle(i),
        }
    }
}

/// Index into `weights` chosen proportionally to weight
pub fn weighted_index(rng: &mut dyn RandomSource, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 {
        return 0;
    }
    let mut roll = rng.next_f64() * total;
    for (i, w) in weights.iter().enumerate() {
        if *w <= 0.0 {
            continue;
        }
        if roll < *w {
            return i;
        }
        roll -= w;
    }
    weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::office::OfficeConfig;
    use crate::office::random::ScriptedRandom;

    fn quiet_office() -> Office {
        let config = OfficeConfig {
            meeting_interval_ms: crate::office::Window::new(10_000_000, 10_000_000),
            ..OfficeConfig::default()
        };
        Office::with_random(config, Box::new(ScriptedRandom::constant(0.0))).unwrap()
    }

    fn event(id: &str, task: &str, agent: &str, status: TaskStatus) -> TaskEvent {
        TaskEvent {
            event_id: id.to_string(),
            task_id: task.to_string(),
            agent_id: AgentId::from(agent),
            status,
            source: "slack".to_string(),
            title: "Fix the flaky integration test".to_string(),
            timestamp: "2026-10-15T09:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_weighted_index_walks_cumulative_weights() {
        let weights = [0.5, 0.0, 0.3, 0.2];
        assert_eq!(weighted_index(&mut ScriptedRandom::constant(0.1), &weights), 0);
        assert_eq!(weighted_index(&mut ScriptedRandom::constant(0.6), &weights), 2);
        assert_eq!(weighted_index(&mut ScriptedRandom::constant(0.95), &weights), 3);
    }

    #[test]
    fn test_assignment_notifies_immediately() {
        let mut office = quiet_office();
        let outcome = office.apply_event(event("e1", "t1", "coder", TaskStatus::Assigned));
        assert_eq!(outcome, EventOutcome::Applied);

        let coder = office.agent("coder").unwrap();
        assert_eq!(coder.state, AgentState::TaskNotified);
        assert_eq!(coder.pulse, 1.0);
        assert_eq!(coder.notify_color, "#41c7f4");
        assert_eq!(
            coder.bubble.as_ref().unwrap().text,
            "slack: Fix the flaky integrat"
        );
    }

    #[test]
    fn test_assignment_while_working_is_queued() {
        let mut office = quiet_office();
        office.apply_event(event("e1", "t1", "coder", TaskStatus::Assigned));
        let working = |o: &Office| o.agent("coder").unwrap().state == AgentState::TaskWorking;
        assert!(office.run_until(5_000, working));

        let outcome = office.apply_event(event("e2", "t2", "coder", TaskStatus::Assigned));
        assert_eq!(outcome, EventOutcome::Queued);
        let coder = office.agent("coder").unwrap();
        assert_eq!(coder.state, AgentState::TaskWorking);
        assert_eq!(coder.current_task.as_ref().unwrap().task_id, "t1");
        assert_eq!(coder.queue.len(), 1);
    }

    #[test]
    fn test_assignment_cancels_idle_reservation() {
        let mut office = quiet_office();
        assert!(office.begin_activity("daily", Activity::Coffee).unwrap());
        assert!(office.spots().held_by(&AgentId::from("daily")).is_some());

        office.apply_event(event("e1", "t1", "daily", TaskStatus::Assigned));
        let daily = office.agent("daily").unwrap();
        assert!(office.spots().held_by(&daily.id).is_none());
        assert!(daily.reserved.is_none());
        assert!(!daily.is_moving());
    }

    #[test]
    fn test_invalid_and_unknown_events_dropped() {
        let mut office = quiet_office();
        assert_eq!(
            office.apply_event(event("e1", "t1", "", TaskStatus::Assigned)),
            EventOutcome::Invalid
        );
        assert_eq!(
            office.apply_event(event("e2", "t1", "janitor", TaskStatus::Assigned)),
            EventOutcome::UnknownAgent
        );
        assert_eq!(office.feed().task_count(), 0);
        assert!(office.agents().iter().all(|a| !a.state.is_task()));
    }

    #[test]
    fn test_done_for_queued_task_removes_it() {
        let mut office = quiet_office();
        office.apply_event(event("e1", "t1", "kalshi", TaskStatus::Assigned));
        office.run_until(5_000, |o| o.agent("kalshi").unwrap().state == AgentState::TaskWorking);
        office.apply_event(event("e2", "t2", "kalshi", TaskStatus::Assigned));

        let outcome = office.apply_event(event("e3", "t2", "kalshi", TaskStatus::Failed));
        assert_eq!(outcome, EventOutcome::Ignored);
        let kalshi = office.agent("kalshi").unwrap();
        assert!(kalshi.queue.is_empty());
        assert_eq!(kalshi.state, AgentState::TaskWorking);
    }

    #[test]
    fn test_displaced_task_is_requeued() {
        let mut office = quiet_office();
        office.apply_event(event("e1", "t1", "main", TaskStatus::Assigned));
        office.apply_event(event("e2", "t2", "main", TaskStatus::Assigned));

        let main = office.agent("main").unwrap();
        assert_eq!(main.current_task.as_ref().unwrap().task_id, "t2");
        assert_eq!(main.queue.front().unwrap().task_id, "t1");
    }

    #[test]
    fn test_begin_activity_refuses_busy_agents() {
        let mut office = quiet_office();
        office.apply_event(event("e1", "t1", "marketer", TaskStatus::Assigned));
        assert!(!office.begin_activity("marketer", Activity::Lounge).unwrap());
        assert!(office.begin_activity("nobody", Activity::Lounge).is_err());
    }
}
