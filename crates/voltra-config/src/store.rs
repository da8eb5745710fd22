//! The storage-backend capability this crate consumes but does not provide.
//!
//! Storage backends (local filesystem, cloud blob/table stores) are out of
//! scope for this crate; it only needs to know how to ask *something* to
//! activate a descriptor and hand back an opaque handle.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use voltra_types::StoreId;

use crate::error::ConfigError;

/// Identifies a storage backend to activate: a provider kind plus whatever
/// connection details that provider needs.
///
/// Carries no independent id: the app-config surface only exposes
/// `store-provider`/`store-endpoint` as flat scalars (§6), so the
/// [`StoreId`] a descriptor resolves to is derived from those two fields
/// rather than tracked separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDescriptor {
    pub provider: String,
    pub endpoint: Option<String>,
}

impl StoreDescriptor {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// The built-in default: a local filesystem-backed store that needs no
    /// external activation.
    pub fn local() -> Self {
        Self::new("local")
    }

    /// The [`StoreId`] this descriptor resolves to: the provider name alone,
    /// or `provider:endpoint` when an endpoint narrows it further.
    pub fn store_id(&self) -> StoreId {
        match &self.endpoint {
            Some(endpoint) => StoreId::new(format!("{}:{endpoint}", self.provider)),
            None => StoreId::new(self.provider.as_str()),
        }
    }
}

impl Default for StoreDescriptor {
    fn default() -> Self {
        Self::local()
    }
}

/// Opaque handle to an activated store. The controller never inspects its
/// contents, only threads it through to callers that need to address the
/// store by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub id: StoreId,
    pub provider: String,
}

/// Registers and resolves storage backends by descriptor.
///
/// A real deployment wires in an implementation backed by whatever store
/// providers it supports; this crate only depends on the trait.
#[async_trait]
pub trait StoreRegistry: Send + Sync {
    async fn activate(&self, descriptor: &StoreDescriptor) -> Result<StoreInfo, ConfigError>;
    async fn try_get_store_info(&self, id: &StoreId) -> Option<StoreInfo>;
}

/// Activates any descriptor immediately and remembers it for lookup.
///
/// Used as the default registry when nothing else has been wired in, which
/// is sufficient for the `local` store and for tests.
#[derive(Debug, Default)]
pub struct NullStoreRegistry {
    activated: Mutex<HashMap<StoreId, StoreInfo>>,
}

#[async_trait]
impl StoreRegistry for NullStoreRegistry {
    async fn activate(&self, descriptor: &StoreDescriptor) -> Result<StoreInfo, ConfigError> {
        let info = StoreInfo {
            id: descriptor.store_id(),
            provider: descriptor.provider.clone(),
        };
        self.activated
            .lock()
            .await
            .insert(info.id.clone(), info.clone());
        Ok(info)
    }

    async fn try_get_store_info(&self, id: &StoreId) -> Option<StoreInfo> {
        self.activated.lock().await.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn activating_a_descriptor_makes_it_resolvable_by_id() {
        let registry = NullStoreRegistry::default();
        let descriptor = StoreDescriptor::new("s3").with_endpoint("bucket");
        let info = registry.activate(&descriptor).await.unwrap();
        assert_eq!(info.id, descriptor.store_id());
        let resolved = registry.try_get_store_info(&descriptor.store_id()).await;
        assert_eq!(resolved, Some(info));
    }

    #[tokio::test]
    async fn an_unactivated_id_does_not_resolve() {
        let registry = NullStoreRegistry::default();
        assert!(registry
            .try_get_store_info(&StoreId::new("never-activated"))
            .await
            .is_none());
    }
}
