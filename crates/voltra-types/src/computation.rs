//! The serialized, dependency-complete submission payload for a cloud process.

use serde::{Deserialize, Serialize};

use crate::ids::ClientId;

/// One entry of a computation's transitive dependency manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub assembly_id: String,
    pub size: u64,
    pub hash: String,
}

/// An opaque, fully-packaged computation ready to submit to the cluster.
///
/// Built exclusively by `ComputationPackager`; the core never inspects
/// `payload`, it only ever forwards it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationImage {
    pub client_id: ClientId,
    pub name: String,
    pub payload: Vec<u8>,
    pub return_type_tag: String,
    pub dependencies: Vec<Dependency>,
}

impl ComputationImage {
    pub fn total_dependency_size(&self) -> u64 {
        self.dependencies.iter().map(|d| d.size).sum()
    }
}
