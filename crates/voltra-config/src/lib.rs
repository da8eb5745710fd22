//! Process-wide settings for the Voltra client controller.
//!
//! `Settings` resolve through layered sources, each overriding the last:
//! built-in defaults, a user config file (XDG config dir), a project config
//! file (`voltra.toml`), a project-local override (`voltra.local.toml`, not
//! meant to be checked in), and finally `VOLTRA_`-prefixed environment
//! variables.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use voltra_types::{ClientId, StoreId};

mod error;
mod loader;
mod paths;
mod store;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;
pub use store::{NullStoreRegistry, StoreDescriptor, StoreInfo, StoreRegistry};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_STORE_PROVIDER: &str = "local";

/// The on-disk/env shape of settings. Config files may additionally use the
/// kebab-case app-config key names from the external interface list
/// (`mbraced-path`, `working-directory`, `store-provider`, `store-endpoint`)
/// via `serde` aliases; environment variables use the snake_case field names
/// since POSIX env var names cannot contain hyphens. `store-provider` and
/// `store-endpoint` are assembled into a [`StoreDescriptor`] after
/// deserialization rather than kept nested, since the app-config surface
/// exposes them as flat scalars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct SettingsData {
    client_id: Option<ClientId>,
    default_timeout_ms: u64,
    #[serde(alias = "working-directory")]
    working_directory: PathBuf,
    #[serde(alias = "mbraced-path")]
    executable_path: Option<PathBuf>,
    #[serde(alias = "store-provider")]
    store_provider: String,
    #[serde(alias = "store-endpoint")]
    store_endpoint: Option<String>,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            client_id: None,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            working_directory: PathBuf::from(".voltra"),
            executable_path: None,
            store_provider: DEFAULT_STORE_PROVIDER.to_string(),
            store_endpoint: None,
        }
    }
}

impl SettingsData {
    fn store_descriptor(&self) -> StoreDescriptor {
        let mut descriptor = StoreDescriptor::new(self.store_provider.as_str());
        if let Some(endpoint) = &self.store_endpoint {
            descriptor = descriptor.with_endpoint(endpoint.clone());
        }
        descriptor
    }
}

/// Process-wide configuration, readable concurrently with writes serialized
/// against each other.
///
/// Cheap to clone: clones share the same underlying state and store
/// registry.
#[derive(Clone)]
pub struct Settings {
    inner: Arc<RwLock<SettingsData>>,
    store_registry: Arc<dyn StoreRegistry>,
}

impl Settings {
    fn new(data: SettingsData, store_registry: Arc<dyn StoreRegistry>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
            store_registry,
        }
    }

    /// Settings built entirely from defaults, with a [`NullStoreRegistry`].
    /// Useful for tests and for callers that have not wired in a real store
    /// registry.
    pub fn in_memory() -> Self {
        Self::new(SettingsData::default(), Arc::new(NullStoreRegistry::default()))
    }

    /// The controller's client id. Assigned on first access if no layered
    /// source supplied one, and stable for the lifetime of this `Settings`
    /// from then on.
    pub async fn client_id(&self) -> ClientId {
        {
            let data = self.inner.read().await;
            if let Some(id) = data.client_id {
                return id;
            }
        }
        let mut data = self.inner.write().await;
        if let Some(id) = data.client_id {
            return id;
        }
        let id = ClientId::new();
        data.client_id = Some(id);
        id
    }

    pub async fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.inner.read().await.default_timeout_ms)
    }

    pub async fn set_default_timeout(&self, timeout: Duration) {
        let mut data = self.inner.write().await;
        data.default_timeout_ms = timeout.as_millis() as u64;
    }

    pub async fn working_directory(&self) -> PathBuf {
        self.inner.read().await.working_directory.clone()
    }

    pub async fn set_working_directory(&self, dir: PathBuf) {
        let mut data = self.inner.write().await;
        data.working_directory = dir;
    }

    pub async fn executable_path(&self) -> Option<PathBuf> {
        self.inner.read().await.executable_path.clone()
    }

    pub async fn set_executable_path(&self, path: PathBuf) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ValidationError(format!(
                "executable path does not exist: {}",
                path.display()
            )));
        }
        let mut data = self.inner.write().await;
        data.executable_path = Some(path);
        Ok(())
    }

    pub async fn default_store_provider(&self) -> StoreDescriptor {
        self.inner.read().await.store_descriptor()
    }

    /// Activates `descriptor` against the store registry, then installs it as
    /// the default store provider. The new value is never visible to readers
    /// unless activation succeeds.
    pub async fn set_default_store_provider(
        &self,
        descriptor: StoreDescriptor,
    ) -> Result<StoreInfo, ConfigError> {
        let info = self.store_registry.activate(&descriptor).await?;
        let mut data = self.inner.write().await;
        data.store_provider = descriptor.provider;
        data.store_endpoint = descriptor.endpoint;
        Ok(info)
    }

    pub async fn try_get_store_info(&self, id: &StoreId) -> Option<StoreInfo> {
        self.store_registry.try_get_store_info(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_id_is_stable_once_assigned() {
        let settings = Settings::in_memory();
        let first = settings.client_id().await;
        let second = settings.client_id().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn default_timeout_matches_the_documented_default() {
        let settings = Settings::in_memory();
        assert_eq!(settings.default_timeout().await, Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn setting_the_store_provider_activates_it_before_it_is_visible() {
        let settings = Settings::in_memory();
        let descriptor = StoreDescriptor::new("s3").with_endpoint("bucket");
        settings
            .set_default_store_provider(descriptor.clone())
            .await
            .unwrap();
        assert_eq!(settings.default_store_provider().await, descriptor);
        assert!(settings
            .try_get_store_info(&descriptor.store_id())
            .await
            .is_some());
    }

    #[tokio::test]
    async fn setting_an_executable_path_that_does_not_exist_is_rejected() {
        let settings = Settings::in_memory();
        let err = settings
            .set_executable_path(PathBuf::from("/does/not/exist/voltra-node"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
