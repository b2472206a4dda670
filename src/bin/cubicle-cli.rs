//! Cubicle CLI - Command-line driver for the office simulation
//!
//! Provides subcommands for writing a config file, running a headless
//! simulation with scripted events, and running a live office fed from stdin.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cubicle::office::EventOutcome;
use cubicle::office::demo::DemoPulse;
use cubicle::office::ingest::{RawTaskEvent, parse_line};
use cubicle::office::random::SeededRandom;
use cubicle::office::storage::{load_config, write_config};
use cubicle::{Office, OfficeConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cubicle")]
#[command(about = "Tick-driven virtual office simulation", long_about = None)]
struct Cli {
    /// Office configuration file (defaults when absent)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed override for the random source
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    InitConfig {
        /// Destination path
        #[arg(long, default_value = "office.json")]
        path: PathBuf,
    },

    /// Run a headless simulation for a number of ticks
    Run {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "3750")]
        ticks: u64,

        /// JSON-lines file of raw task events, each with an `atMs` offset
        #[arg(long)]
        events: Option<PathBuf>,

        /// Generate demo traffic while no task has arrived
        #[arg(long)]
        demo: bool,

        /// Print a status line every N ticks (0 disables)
        #[arg(long, default_value = "0")]
        every: u64,

        /// Print the final snapshot as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run in real time, reading raw task events from stdin
    Live {
        /// Generate demo traffic while no task has arrived
        #[arg(long)]
        demo: bool,

        /// Seconds between status log lines
        #[arg(long, default_value = "5")]
        status_secs: u64,
    },
}

/// One line of a scripted events file
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptedEvent {
    #[serde(default)]
    at_ms: u64,
    #[serde(flatten)]
    raw: RawTaskEvent,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => OfficeConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    match cli.command {
        Commands::InitConfig { path } => {
            write_config(&path, &config)?;
            println!("Wrote office configuration to {:?}", path);
        }

        Commands::Run {
            ticks,
            events,
            demo,
            every,
            json,
        } => {
            let script = match events {
                Some(path) => load_script(&path)?,
                None => Vec::new(),
            };
            run_headless(config, ticks, script, demo, every, json)?;
        }

        Commands::Live { demo, status_secs } => {
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(run_live(config, demo, status_secs))?;
        }
    }

    Ok(())
}

fn load_script(path: &Path) -> Result<Vec<ScriptedEvent>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read events file: {:?}", path))?;
    let mut script = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: ScriptedEvent = serde_json::from_str(line)
            .with_context(|| format!("{:?} line {}: invalid event", path, n + 1))?;
        script.push(event);
    }
    script.sort_by_key(|e| e.at_ms);
    Ok(script)
}

fn demo_pulse(office: &Office) -> DemoPulse {
    let rng = match office.config().seed {
        Some(seed) => SeededRandom::from_seed(seed.wrapping_add(1)),
        None => SeededRandom::from_entropy(),
    };
    DemoPulse::new(Box::new(rng), office.now())
}

fn run_headless(
    config: OfficeConfig,
    ticks: u64,
    script: Vec<ScriptedEvent>,
    demo: bool,
    every: u64,
    json: bool,
) -> Result<()> {
    let mut office = Office::new(config)?;
    let mut demo = demo.then(|| demo_pulse(&office));
    let mut script = script.into_iter().peekable();

    for n in 1..=ticks {
        office.tick();
        let now = office.now().as_millis();
        while let Some(event) = script.next_if(|e| e.at_ms <= now) {
            let outcomes = office.ingest(&event.raw);
            log_outcomes(&outcomes);
        }
        if let Some(pulse) = demo.as_mut() {
            pulse.poll(&mut office);
        }
        if every > 0 && n % every == 0 {
            print_status_line(&office);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&office.snapshot())?);
    } else {
        print_table(&office);
    }
    Ok(())
}

async fn run_live(config: OfficeConfig, demo: bool, status_secs: u64) -> Result<()> {
    let mut office = Office::new(config)?;
    let mut demo = demo.then(|| demo_pulse(&office));

    let mut frame = tokio::time::interval(Duration::from_millis(office.config().frame_ms));
    let mut status = tokio::time::interval(Duration::from_secs(status_secs.max(1)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    info!(agents = office.agents().len(), "office open");
    loop {
        tokio::select! {
            _ = frame.tick() => {
                office.tick();
                if let Some(pulse) = demo.as_mut() {
                    pulse.poll(&mut office);
                }
            }
            _ = status.tick() => {
                for row in office.status() {
                    info!(
                        agent = %row.id,
                        state = %row.state,
                        activity = %row.activity,
                        queued = row.queued,
                        task = row.task.as_deref().unwrap_or("-"),
                        "status"
                    );
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match parse_line(&line) {
                        Ok(raw) => {
                            let outcomes = office.ingest(&raw);
                            log_outcomes(&outcomes);
                        }
                        Err(e) => warn!(error = %e, "ignoring malformed event"),
                    },
                    None => {
                        info!("stdin closed, simulation keeps running");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(at = %office.now(), "shutting down");
                break;
            }
        }
    }
    Ok(())
}

fn print_status_line(office: &Office) {
    let summary: Vec<String> = office
        .agents()
        .iter()
        .map(|a| format!("{}={}", a.id, a.state.label()))
        .collect();
    println!("[{}] {}", office.now(), summary.join(" "));
}

fn log_outcomes(outcomes: &[EventOutcome]) {
    if outcomes.iter().any(EventOutcome::is_dropped) {
        warn!(?outcomes, "event dropped");
    } else {
        info!(?outcomes, "event applied");
    }
}

fn print_table(office: &Office) {
    println!("Simulated time: {}", office.now());
    println!(
        "Meeting in progress: {}",
        if office.meeting_in_progress() { "yes" } else { "no" }
    );
    println!(
        "{:<10} {:<8} {:<13} {:<11} {:<10} {:>6}  TASK",
        "AGENT", "NAME", "ROLE", "STATE", "ACTIVITY", "QUEUED"
    );
    for row in office.status() {
        println!(
            "{:<10} {:<8} {:<13} {:<11} {:<10} {:>6}  {}",
            row.id,
            row.name,
            row.role,
            row.state,
            row.activity,
            row.queued,
            row.task.as_deref().unwrap_or("-")
        );
    }

    let recent = office.feed().recent_tasks(20);
    if !recent.is_empty() {
        println!();
        println!("Recent tasks:");
        for event in recent {
            println!(
                "  {} {:<8} {:<8} {} ({})",
                event.timestamp,
                event.status.as_str(),
                event.agent_id.as_str(),
                event.title,
                event.source
            );
        }
    }
}
