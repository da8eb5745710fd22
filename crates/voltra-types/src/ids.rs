//! Newtype identifiers used throughout the controller.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a single cloud process submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(Uuid);

impl ProcessId {
    /// Generates a fresh, random process id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ProcessId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<ProcessId> for Uuid {
    fn from(id: ProcessId) -> Self {
        id.0
    }
}

/// Identifies a booted incarnation of a cluster.
///
/// The all-zero UUID is reserved: a [`ClusterView`](crate::ClusterView) with
/// a zero `DeploymentId` is unbooted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeploymentId(Uuid);

impl DeploymentId {
    /// The sentinel deployment id for an unbooted cluster.
    pub const UNBOOTED: DeploymentId = DeploymentId(Uuid::nil());

    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_unbooted(&self) -> bool {
        *self == Self::UNBOOTED
    }
}

impl Default for DeploymentId {
    fn default() -> Self {
        Self::UNBOOTED
    }
}

impl Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for DeploymentId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Identifies the controller process submitting work, embedded in every
/// outgoing message so the cluster side can deduplicate retried requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ClientId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Opaque identifier for a storage backend, e.g. `"local"` or `"s3://bucket"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreId(String);

impl StoreId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StoreId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StoreId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_id_default_is_unbooted() {
        assert!(DeploymentId::default().is_unbooted());
        assert!(DeploymentId::UNBOOTED.is_unbooted());
        assert!(!DeploymentId::new().is_unbooted());
    }

    #[test]
    fn process_id_roundtrips_through_uuid() {
        let id = ProcessId::new();
        let uuid: Uuid = id.into();
        assert_eq!(ProcessId::from(uuid), id);
    }
}
