use std::process::ExitCode;

use engine::{run_fixed_loop, IdleInput};
use streets::write_snapshot;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(mut app: AppWiring) -> ExitCode {
    let summary = match run_fixed_loop(&app.config, &mut app.state, &mut IdleInput) {
        Ok(summary) => summary,
        Err(err) => {
            error!(error = %err, "loop_failed");
            return ExitCode::FAILURE;
        }
    };

    let state = &app.state;
    info!(
        ticks_run = summary.ticks_run,
        quit_requested = summary.quit_requested,
        dropped_backlog_ms = summary.dropped_backlog.as_millis() as u64,
        tps = summary.timings.ticks_per_second(summary.wall_time),
        mean_tick_ms = summary.timings.mean().as_secs_f64() * 1000.0,
        "loop_finished"
    );
    let player = state.player();
    info!(
        cash = player.cash,
        total_earned = player.stats.total_earned,
        kills = player.stats.kills,
        missions_completed = state.missions().completed_count(),
        game_won = state.game_won(),
        "session_summary"
    );

    if let Some(path) = &app.save_on_exit {
        if let Err(err) = write_snapshot(path, &state.capture_snapshot()) {
            error!(error = %err, "final_save_failed");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
