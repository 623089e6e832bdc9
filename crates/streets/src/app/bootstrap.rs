use std::env;
use std::path::PathBuf;

use engine::{resolve_app_paths, LoopConfig, StartupError};
use streets::{load_config_from_env, read_snapshot, ConfigError, GameState};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MAX_TICKS_ENV_VAR: &str = "STREETS_MAX_TICKS";
const LOAD_SAVE_ENV_VAR: &str = "STREETS_LOAD_SAVE";
const SAVE_ON_EXIT_ENV_VAR: &str = "STREETS_SAVE_ON_EXIT";

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) state: GameState,
    /// Where the final snapshot goes, when one was asked for.
    pub(crate) save_on_exit: Option<PathBuf>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Streets Startup ===");

    let paths = resolve_app_paths()?;
    let sim_config = load_config_from_env()?;
    let mut state = GameState::new(sim_config)?;

    if let Some(name) = env_file_name(LOAD_SAVE_ENV_VAR) {
        let path = paths.save_file(&name);
        match read_snapshot(&path) {
            Ok(snapshot) => {
                state.restore_snapshot(&snapshot);
                info!(path = %path.display(), cash = snapshot.cash, "save_loaded");
            }
            Err(err) => warn!(error = %err, "save_load_failed"),
        }
    }

    let config = LoopConfig {
        max_ticks: parse_max_ticks_from_env(),
        ..LoopConfig::default()
    };
    let save_on_exit = env_file_name(SAVE_ON_EXIT_ENV_VAR).map(|name| paths.save_file(&name));
    info!(
        root = %paths.root.display(),
        max_ticks = ?config.max_ticks,
        save_on_exit = save_on_exit.is_some(),
        "app_wired"
    );

    Ok(AppWiring {
        config,
        state,
        save_on_exit,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn env_file_name(var: &'static str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|name| !name.is_empty())
}

fn parse_max_ticks_from_env() -> Option<u64> {
    let raw = env::var(MAX_TICKS_ENV_VAR).ok()?;
    parse_max_ticks(&raw)
}

fn parse_max_ticks(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            warn!(
                var = MAX_TICKS_ENV_VAR,
                value = raw,
                "invalid tick limit; running until quit"
            );
            None
        }
        Ok(ticks) => Some(ticks),
    }
}
