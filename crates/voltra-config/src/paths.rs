//! Path utilities and XDG directory discovery.

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// The subdirectories maintained under `workingDirectory` while the
/// controller is running.
const WORKING_SUBDIRS: [&str; 3] = ["assemblyCache", "localCache", "dependencyStage"];

/// XDG-compliant paths for Voltra's client-side configuration and state.
pub struct Paths {
    project_dirs: Option<ProjectDirs>,
}

impl Paths {
    /// Create a new `Paths` instance with XDG discovery.
    pub fn new() -> Self {
        Self {
            project_dirs: ProjectDirs::from("dev", "Voltra", "voltra"),
        }
    }

    /// Get user config directory (`~/.config/voltra/`).
    pub fn user_config_dir(&self) -> Result<PathBuf, ConfigError> {
        self.project_dirs
            .as_ref()
            .map(|p| p.config_dir().to_path_buf())
            .ok_or_else(|| {
                ConfigError::XdgError("failed to determine user config directory".to_string())
            })
    }

    /// Get user config file path (`~/.config/voltra/config.toml`).
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.user_config_dir()?.join("config.toml"))
    }

    /// Get project config file path (`voltra.toml`).
    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("voltra.toml")
    }

    /// Get project-local override file path (`voltra.local.toml`, not meant
    /// to be checked in).
    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("voltra.local.toml")
    }

    /// Check if a project has been initialized (has `voltra.toml`).
    pub fn is_initialized(project_dir: impl AsRef<Path>) -> bool {
        Self::project_config_file(project_dir).exists()
    }

    /// Recreates `workingDirectory/{assemblyCache,localCache,dependencyStage}`.
    ///
    /// Called once at controller startup; the directory is left in place on
    /// disposal, so repeated runs start from a clean slate rather than
    /// accumulating stale state from a previous process.
    pub fn recreate_working_directory(working_dir: impl AsRef<Path>) -> Result<(), ConfigError> {
        let working_dir = working_dir.as_ref();
        if working_dir.exists() {
            std::fs::remove_dir_all(working_dir).map_err(|source| ConfigError::ReadError {
                path: working_dir.to_path_buf(),
                source,
            })?;
        }
        for subdir in WORKING_SUBDIRS {
            let path = working_dir.join(subdir);
            std::fs::create_dir_all(&path)
                .map_err(|source| ConfigError::ReadError { path, source })?;
        }
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
