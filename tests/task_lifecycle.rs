//! Integration tests for the task lifecycle
//!
//! Drives agents through assignment, commute, work, synthesized completion and
//! queue draining using scripted randomness.

use cubicle::office::agent::AgentId;
use cubicle::office::events::FeedEntry;
use cubicle::office::random::ScriptedRandom;
use cubicle::office::{Activity, AgentState, EventOutcome, Office, TaskEvent, TaskStatus, Window};
use cubicle::OfficeConfig;

fn quiet_office() -> Office {
    let epoch = chrono::DateTime::parse_from_rfc3339("2026-10-15T10:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let config = OfficeConfig {
        epoch: Some(epoch),
        meeting_interval_ms: Window::new(10_000_000, 10_000_000),
        ..OfficeConfig::default()
    };
    Office::with_random(config, Box::new(ScriptedRandom::constant(0.0))).unwrap()
}

fn task(event_id: &str, task_id: &str, agent: &str, status: TaskStatus) -> TaskEvent {
    TaskEvent {
        event_id: event_id.to_string(),
        task_id: task_id.to_string(),
        agent_id: AgentId::from(agent),
        status,
        source: "telegram".to_string(),
        title: format!("Task {task_id}"),
        timestamp: "2026-10-15T10:00:00.000Z".to_string(),
    }
}

fn state_of(office: &Office, agent: &str) -> AgentState {
    office.agent(agent).unwrap().state
}

#[test]
fn test_coder_full_lifecycle() {
    let mut office = quiet_office();

    // Send the coder to the kitchen so the commute is a real walk.
    assert!(office.begin_activity("coder", Activity::Coffee).unwrap());
    office.run_for(1_000);
    let away = office.agent("coder").unwrap();
    assert!(away.pos.distance(away.desk) > 10.0);

    let outcome = office.apply_event(task("e1", "t1", "coder", TaskStatus::Assigned));
    assert_eq!(outcome, EventOutcome::Applied);
    assert_eq!(state_of(&office, "coder"), AgentState::TaskNotified);
    assert!(office.spots().held_by(&AgentId::from("coder")).is_none());

    assert!(office.run_until(2_000, |o| state_of(o, "coder") == AgentState::TaskCommute));
    assert!(office.run_until(60_000, |o| state_of(o, "coder") == AgentState::TaskWorking));
    let coder = office.agent("coder").unwrap();
    assert_eq!(coder.pos, coder.desk);

    assert!(office.run_until(10_000, |o| state_of(o, "coder") == AgentState::TaskDone));
    let synthesized = office
        .feed()
        .recent_tasks(20)
        .into_iter()
        .find(|e| e.task_id == "t1")
        .cloned()
        .unwrap();
    assert_eq!(synthesized.status, TaskStatus::Done);
    assert!(synthesized.event_id.starts_with("auto-coder-"));

    assert!(office.run_until(5_000, |o| !o.agent("coder").unwrap().state.is_task()));
    let coder = office.agent("coder").unwrap();
    assert!(coder.current_task.is_none());
    assert_eq!(coder.activity, Activity::Desk);
}

#[test]
fn test_duplicate_event_is_noop() {
    let mut office = quiet_office();
    let event = task("dup-1", "t1", "daily", TaskStatus::Assigned);

    assert_eq!(office.apply_event(event.clone()), EventOutcome::Applied);
    let before = office.agent("daily").unwrap().clone();
    let history = office.feed().history().count();

    assert_eq!(office.apply_event(event), EventOutcome::Duplicate);
    let after = office.agent("daily").unwrap();
    assert_eq!(after.state, before.state);
    assert_eq!(after.state_until, before.state_until);
    assert_eq!(after.queue.len(), before.queue.len());
    assert_eq!(office.feed().history().count(), history);
}

#[test]
fn test_queue_drains_in_order() {
    let mut office = quiet_office();
    office.apply_event(task("e1", "t1", "marketer", TaskStatus::Assigned));
    assert!(office.run_until(5_000, |o| state_of(o, "marketer") == AgentState::TaskWorking));

    assert_eq!(
        office.apply_event(task("e2", "t2", "marketer", TaskStatus::Assigned)),
        EventOutcome::Queued
    );
    assert_eq!(
        office.apply_event(task("e3", "t3", "marketer", TaskStatus::Assigned)),
        EventOutcome::Queued
    );

    let mut order = Vec::new();
    let mut last = String::new();
    office.run_until(60_000, |o| {
        let agent = o.agent("marketer").unwrap();
        if let Some(current) = &agent.current_task {
            if current.task_id != last {
                last = current.task_id.clone();
                order.push(last.clone());
            }
        }
        order.len() == 3 && !agent.state.is_task()
    });
    assert_eq!(order, ["t1", "t2", "t3"]);
}

#[test]
fn test_dequeue_waits_for_terminal_dwell() {
    let mut office = quiet_office();
    office.apply_event(task("e1", "t1", "kalshi", TaskStatus::Assigned));
    office.run_until(5_000, |o| state_of(o, "kalshi") == AgentState::TaskWorking);
    office.apply_event(task("e2", "t2", "kalshi", TaskStatus::Assigned));

    office.apply_event(task("e3", "t1", "kalshi", TaskStatus::Done));
    let kalshi = office.agent("kalshi").unwrap();
    assert_eq!(kalshi.state, AgentState::TaskDone);
    assert_eq!(kalshi.current_task.as_ref().unwrap().task_id, "t1");
    assert_eq!(kalshi.queue.len(), 1);

    office.run_for(1_000);
    let kalshi = office.agent("kalshi").unwrap();
    assert_eq!(kalshi.state, AgentState::TaskDone);
    assert_eq!(kalshi.queue.len(), 1);

    office.run_for(500);
    let kalshi = office.agent("kalshi").unwrap();
    assert_eq!(kalshi.state, AgentState::TaskNotified);
    assert_eq!(kalshi.current_task.as_ref().unwrap().task_id, "t2");
    assert!(kalshi.queue.is_empty());
}

#[test]
fn test_failure_shows_failed_state() {
    let mut office = quiet_office();
    office.apply_event(task("e1", "t1", "main", TaskStatus::Started));
    assert!(office.run_until(2_000, |o| state_of(o, "main") == AgentState::TaskWorking));

    assert_eq!(
        office.apply_event(task("e2", "t1", "main", TaskStatus::Failed)),
        EventOutcome::Applied
    );
    let main = office.agent("main").unwrap();
    assert_eq!(main.state, AgentState::TaskFailed);
    assert_eq!(main.notify_color, "#ff6262");

    let failed = office.feed().history().any(|entry| {
        matches!(entry, FeedEntry::Task(e) if e.task_id == "t1" && e.status == TaskStatus::Failed)
    });
    assert!(failed);
}

#[test]
fn test_ingested_payload_reaches_agent() {
    let mut office = quiet_office();
    let outcomes = office
        .ingest_line(r#"{"eventId":"hook-1","agentId":"Mehmet","status":"todo","title":"Check BTC"}"#)
        .unwrap();
    assert_eq!(outcomes, vec![EventOutcome::Applied]);

    let kalshi = office.agent("kalshi").unwrap();
    assert_eq!(kalshi.state, AgentState::TaskNotified);
    assert_eq!(kalshi.current_task.as_ref().unwrap().source, "openclaw");

    let outcomes = office
        .ingest_line(r#"{"agentId":"janitor","status":"todo"}"#)
        .unwrap();
    assert_eq!(outcomes, vec![EventOutcome::UnknownAgent]);
}
