//! Layered settings resolution.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ConfigError;
use crate::store::{NullStoreRegistry, StoreRegistry};
use crate::{Paths, Settings, SettingsData};

/// Builds a [`Settings`] by merging sources in precedence order: built-in
/// defaults, user config file, project config file, project-local override,
/// then environment variables.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new loader rooted at the current directory.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "VOLTRA".to_string(),
        }
    }

    /// Set the project directory `voltra.toml`/`voltra.local.toml` are read
    /// from.
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default `VOLTRA`).
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Resolve settings using a [`NullStoreRegistry`].
    pub fn load(self) -> Result<Settings, ConfigError> {
        self.load_with_registry(Arc::new(NullStoreRegistry::default()))
    }

    /// Resolve settings, wiring `registry` in as the store capability that
    /// `Settings::set_default_store_provider` activates against.
    pub fn load_with_registry(
        self,
        registry: Arc<dyn StoreRegistry>,
    ) -> Result<Settings, ConfigError> {
        let mut builder = config::Config::builder();

        let defaults = SettingsData::default();
        builder = builder
            .add_source(config::Config::try_from(&defaults).map_err(|e| {
                ConfigError::MergeError(format!("failed to seed defaults: {e}"))
            })?);

        let paths = Paths::new();
        if let Ok(user_config_file) = paths.user_config_file() {
            if user_config_file.exists() {
                builder = builder.add_source(
                    config::File::from(user_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        let built = builder
            .build()
            .map_err(|e| ConfigError::MergeError(e.to_string()))?;

        let mut data: SettingsData = built
            .try_deserialize()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if data.working_directory.is_relative() {
            data.working_directory = self.project_dir.join(&data.working_directory);
        }
        if let Some(path) = &data.executable_path {
            if path.is_relative() {
                data.executable_path = Some(self.project_dir.join(path));
            }
        }

        Ok(Settings::new(data, registry))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
