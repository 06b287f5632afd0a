//! Tether CLI - headless driver for the spatial anchor engine.
//!
//! Runs two scripted sessions over an in-memory runtime at a fixed tick
//! cadence:
//!
//! ```text
//! session 1: create anchors -> (STORABLE -> save) -> erase one
//! session 2: load_all -> LOCATABLE -> anchors reappear with fresh handles
//! ```
//!
//! Each tick advances the runtime clock, then calls `engine.tick()`, which
//! drains completion events and refreshes poses.

mod script;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tether_engine::{
    AnchorEngine, EngineConfig, FrameContext, SpaceHandle, SpatialSupport, TetherConfig, Time,
    sim::SimRuntime,
};

use script::{Script, Step};

const TICK_DURATION: Duration = Duration::from_millis(16);

/// Ticks per scripted session.
const SESSION_TICKS: u64 = 24;

/// Completion latency of the simulated runtime.
const SIM_LATENCY_TICKS: u64 = 2;

const REFERENCE_SPACE: SpaceHandle = SpaceHandle::new(1);

fn init_tracing(log_file: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let mut warnings = Vec::new();
    if let Some(path) = log_file {
        if let Some(parent) = path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!("Failed to create log dir {}: {e}", parent.display()));
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                    .with(env_filter)
                    .init();
                tracing::info!(path = %path.display(), "Logging initialized");
                for warning in warnings {
                    tracing::warn!("{warning}");
                }
                return;
            }
            Err(e) => {
                warnings.push(format!("Failed to open log file {}: {e}", path.display()));
            }
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in warnings {
        tracing::warn!("{warning}");
    }
}

fn frame_at(tick: u64) -> FrameContext {
    let nanos = i64::try_from(TICK_DURATION.as_nanos()).unwrap_or(i64::MAX);
    FrameContext::new(
        REFERENCE_SPACE,
        Time::from_nanos(nanos.saturating_mul(tick as i64)),
    )
}

/// Drive `engine` for `ticks` frames, applying `script` as it goes.
async fn run_session(
    engine: &mut AnchorEngine<SimRuntime>,
    script: &mut Script,
    ticks: u64,
) -> Result<()> {
    let mut frames = tokio::time::interval(TICK_DURATION);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    for _ in 0..ticks {
        frames.tick().await;
        let next = engine.current_tick() + 1;
        let frame = frame_at(next);

        script
            .apply_due(engine, next, frame)
            .with_context(|| format!("scripted step at tick {next} failed"))?;

        engine.runtime_mut().advance_tick();
        let report = engine.tick(frame);
        if report.events > 0 {
            tracing::debug!(
                tick = report.tick,
                events = report.events,
                located = report.poses.located,
                stale = report.poses.stale,
                "Tick"
            );
        }
    }
    if !script.is_empty() {
        tracing::warn!("Session ended with unapplied script steps");
    }
    Ok(())
}

fn print_anchors(label: &str, engine: &AnchorEngine<SimRuntime>) {
    println!("{label}: {} anchor(s)", engine.anchor_count());
    for anchor in engine.anchors() {
        let state = if anchor.is_located() { "tracked" } else { "stale" };
        match anchor.pose() {
            Some(pose) => println!(
                "  {}  {}  ({:.2}, {:.2}, {:.2})  {state}",
                anchor.id(),
                anchor.space(),
                pose.position.x,
                pose.position.y,
                pose.position.z,
            ),
            None => println!("  {}  {}  (never located)", anchor.id(), anchor.space()),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = match TetherConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring config: {e}");
            None
        }
    };
    init_tracing(
        config
            .as_ref()
            .and_then(|c| c.log.as_ref())
            .and_then(|l| l.file.as_deref()),
    );

    let engine_config = EngineConfig::from_config(config.as_ref());
    let support = SpatialSupport::all();

    // Session 1: place three anchors, then erase the first.
    let mut engine = AnchorEngine::new(
        SimRuntime::auto(SIM_LATENCY_TICKS),
        support,
        EngineConfig {
            load_on_start: false,
            ..engine_config.clone()
        },
    );
    let mut script = Script::new(vec![
        Step::create(1, 0.0, 1.2, -1.0),
        Step::create(2, 0.5, 1.2, -1.5),
        Step::create(3, -0.5, 1.0, -2.0),
        Step::erase_first(14),
    ]);
    run_session(&mut engine, &mut script, SESSION_TICKS).await?;
    print_anchors("session 1", &engine);

    let (mut runtime, report) = engine.into_runtime();
    if !report.abandoned.is_empty() {
        tracing::warn!(count = report.abandoned.len(), "Session 1 left requests in flight");
    }
    runtime.end_session();

    // Session 2: only what was saved comes back.
    let mut engine = AnchorEngine::new(
        runtime,
        support,
        EngineConfig {
            load_on_start: true,
            ..engine_config
        },
    );
    let mut script = Script::default();
    run_session(&mut engine, &mut script, SESSION_TICKS).await?;
    print_anchors("session 2", &engine);

    let stats = engine.stats();
    tracing::info!(
        events = stats.events,
        anomalies = stats.anomalies,
        saves = stats.saves_succeeded,
        discovered = stats.discovered,
        "Done"
    );
    engine.shutdown();

    Ok(())
}
