use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;

pub use app::{
    run_fixed_loop, AppError, EntityId, EntityIdAllocator, EntityStore, IdleInput, InputAction,
    InputSnapshot, InputSource, LoopConfig, LoopSummary, Rect, Simulation, TickControl,
    TickTimings, Vec2,
};

pub const ROOT_ENV_VAR: &str = "STREETS_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub save_dir: PathBuf,
}

impl AppPaths {
    pub fn save_file(&self, name: &str) -> PathBuf {
        self.save_dir.join(name)
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current working directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("failed to create save directory at {}: {source}", .path.display())]
    CreateSaveDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "STREETS_ROOT is set but does not point to a directory: {}\n\
Point it at the directory that should hold the saves/ folder.",
        .path.display()
    )]
    InvalidEnvRoot { path: PathBuf },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    app_paths_for_root(root)
}

pub fn app_paths_for_root(root: PathBuf) -> Result<AppPaths, StartupError> {
    let save_dir = root.join("saves");

    fs::create_dir_all(&save_dir).map_err(|source| StartupError::CreateSaveDir {
        path: save_dir.clone(),
        source,
    })?;

    Ok(AppPaths { root, save_dir })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if normalized.is_dir() {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let cwd = env::current_dir().map_err(StartupError::CurrentDir)?;
            Ok(normalize_path(&cwd))
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_paths_create_save_directory_under_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = app_paths_for_root(temp.path().to_path_buf()).expect("paths");

        assert!(paths.save_dir.is_dir());
        assert_eq!(paths.save_dir, temp.path().join("saves"));
        assert_eq!(
            paths.save_file("slot.json"),
            temp.path().join("saves").join("slot.json")
        );
    }

    #[test]
    fn app_paths_reuse_existing_save_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("saves")).expect("pre-create");

        let paths = app_paths_for_root(temp.path().to_path_buf()).expect("paths");
        assert!(paths.save_dir.is_dir());
    }

    #[test]
    fn save_dir_creation_fails_when_root_is_a_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file_root = temp.path().join("not_a_dir");
        fs::write(&file_root, b"x").expect("write");

        let error = app_paths_for_root(file_root).expect_err("file root must fail");
        assert!(matches!(error, StartupError::CreateSaveDir { .. }));
    }
}
