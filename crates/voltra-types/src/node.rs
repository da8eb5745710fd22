//! Addressable handles to remote cluster nodes.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// An opaque, comparable handle identifying a remote node.
///
/// Immutable and cheap to clone; multiple components may hold copies of the
/// same `NodeRef` freely. Equality and ordering are defined over `(address,
/// logical_id)` so a `NodeRef` can be used as a map key for connection
/// pooling or membership bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Transport address, e.g. `"10.0.4.2:9531"`.
    address: String,
    /// Logical id, stable across reconnects to the same logical node even if
    /// its address changes (e.g. after a restart behind a load balancer).
    logical_id: String,
}

impl NodeRef {
    pub fn new(address: impl Into<String>, logical_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            logical_id: logical_id.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.logical_id, self.address)
    }
}

/// The role a node currently occupies in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Master,
    AltMaster,
    Worker,
    /// Reachable but not yet assigned a role (e.g. freshly spawned, not attached).
    Idle,
}

/// A capability a node is permitted to take on.
///
/// A node's `permissions` set determines whether it is eligible to become
/// master (`Permission::Master`) independently of its current `NodeRole`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    Master,
    Worker,
}

/// Everything the controller knows about a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_ref: NodeRef,
    pub role: NodeRole,
    pub permissions: BTreeSet<Permission>,
    pub is_local: bool,
    pub uri: String,
}

impl NodeInfo {
    pub fn can_be_master(&self) -> bool {
        self.permissions.contains(&Permission::Master)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ref_display_includes_both_fields() {
        let r = NodeRef::new("10.0.0.1:9000", "node-0");
        assert_eq!(r.to_string(), "node-0@10.0.0.1:9000");
    }

    #[test]
    fn can_be_master_reflects_permission_set() {
        let mut perms = BTreeSet::new();
        perms.insert(Permission::Worker);
        let info = NodeInfo {
            node_ref: NodeRef::new("a", "b"),
            role: NodeRole::Worker,
            permissions: perms.clone(),
            is_local: false,
            uri: "tcp://a".into(),
        };
        assert!(!info.can_be_master());

        perms.insert(Permission::Master);
        let info = NodeInfo { permissions: perms, ..info };
        assert!(info.can_be_master());
    }
}
