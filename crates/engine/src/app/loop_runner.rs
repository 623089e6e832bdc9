use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::StartupError;

use super::metrics::{TickTimings, TickWindow};
use super::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Quit,
}

/// A fixed-step simulation driven by the loop. One call is one tick.
pub trait Simulation {
    fn update(&mut self, input: &InputSnapshot) -> TickControl;

    fn entity_count(&self) -> usize;
}

/// Supplies exactly one input snapshot per simulation tick.
pub trait InputSource {
    fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn snapshot_for_tick(&mut self, _tick: u64) -> InputSnapshot {
        InputSnapshot::empty()
    }
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// When false, ticks run back to back without sleeping.
    pub paced: bool,
    pub max_ticks: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            paced: true,
            max_ticks: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("an unpaced loop needs a tick limit")]
    UnboundedUnpacedLoop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks_run: u64,
    pub dropped_backlog: Duration,
    pub quit_requested: bool,
    pub wall_time: Duration,
    pub timings: TickTimings,
}

pub fn run_fixed_loop(
    config: &LoopConfig,
    simulation: &mut dyn Simulation,
    input: &mut dyn InputSource,
) -> Result<LoopSummary, AppError> {
    if !config.paced && config.max_ticks.is_none() {
        return Err(AppError::UnboundedUnpacedLoop);
    }

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        paced = config.paced,
        max_ticks = ?config.max_ticks,
        "loop_config"
    );

    let mut summary = LoopSummary::default();
    let mut accumulator = Duration::ZERO;
    let started = Instant::now();
    let mut last_frame_instant = started;
    let mut window = TickWindow::new(started, metrics_log_interval, fixed_dt);

    while !tick_limit_reached(summary.ticks_run, config.max_ticks) {
        let now = Instant::now();
        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
        last_frame_instant = now;

        let ticks_to_run = if config.paced {
            accumulator =
                accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
            let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
            accumulator = step_plan.remaining_accumulator;
            if step_plan.dropped_backlog > Duration::ZERO {
                summary.dropped_backlog = summary
                    .dropped_backlog
                    .saturating_add(step_plan.dropped_backlog);
                warn!(
                    dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                    max_ticks_per_frame, "sim_clamp_triggered"
                );
            }
            step_plan.ticks_to_run
        } else {
            max_ticks_per_frame
        };

        for _ in 0..ticks_to_run {
            if tick_limit_reached(summary.ticks_run, config.max_ticks) {
                break;
            }
            let input_snapshot = input.snapshot_for_tick(summary.ticks_run);
            let tick_start = Instant::now();
            let control = simulation.update(&input_snapshot);
            window.record(tick_start.elapsed());
            summary.ticks_run = summary.ticks_run.saturating_add(1);
            if control == TickControl::Quit {
                summary.quit_requested = true;
                break;
            }
        }

        if let Some((report, timings)) = window.close_if_due(Instant::now()) {
            summary.timings.merge(&timings);
            info!(
                tps = report.tps,
                mean_tick_ms = report.mean_tick_ms,
                slowest_tick_ms = report.slowest_tick_ms,
                over_budget = report.over_budget,
                total_ticks = summary.ticks_run,
                entity_count = simulation.entity_count(),
                "loop_metrics"
            );
        }

        if summary.quit_requested {
            info!(reason = "simulation_quit", "shutdown_requested");
            break;
        }

        if config.paced {
            let elapsed = Instant::now().saturating_duration_since(now);
            let cap_sleep = compute_cap_sleep(elapsed, Some(fixed_dt));
            if cap_sleep > Duration::ZERO {
                thread::sleep(cap_sleep);
            }
        }
    }

    summary.timings.merge(&window.finish());
    summary.wall_time = started.elapsed();

    info!(
        ticks_run = summary.ticks_run,
        slowest_tick_ms = summary.timings.slowest.as_secs_f64() * 1000.0,
        over_budget = summary.timings.over_budget,
        dropped_backlog_ms = summary.dropped_backlog.as_millis() as u64,
        entity_count = simulation.entity_count(),
        "shutdown"
    );
    Ok(summary)
}

fn tick_limit_reached(ticks_run: u64, max_ticks: Option<u64>) -> bool {
    max_ticks.is_some_and(|limit| ticks_run >= limit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}
