//! A fleet of locally-spawned node processes, owned by the controller.

use std::collections::HashMap;

use tracing::{error, info, warn};
use voltra_types::NodeRef;

use crate::error::LifecycleError;
use crate::local_node::{NodeProcess, NodeStatus, SpawnSpec};

/// Tracks every node process this controller has spawned locally.
///
/// Membership in this map is exactly what "local mode" means for
/// [`crate::controller::LifecycleController`]: `Kill` requires every node in
/// the current view to also be a key here.
#[derive(Default)]
pub struct LocalNodeFleet {
    nodes: HashMap<NodeRef, NodeProcess>,
    next_local_id: usize,
}

impl LocalNodeFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns one local node process and returns the `NodeRef` it was
    /// assigned, per the `Spawn` interface (§6).
    pub async fn spawn(&mut self, spec: SpawnSpec) -> Result<NodeRef, LifecycleError> {
        let logical_id = format!("local-{}", self.next_local_id);
        self.next_local_id += 1;
        let address = format!(
            "{}:{}",
            spec.hostname.clone().unwrap_or_else(|| "127.0.0.1".into()),
            spec.port.unwrap_or(0)
        );
        let node_ref = NodeRef::new(address, logical_id);

        let mut process = NodeProcess::new(node_ref.clone(), spec);
        process.start().await?;
        self.nodes.insert(node_ref.clone(), process);
        Ok(node_ref)
    }

    pub fn is_local(&self, node: &NodeRef) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn status(&self, node: &NodeRef) -> Option<NodeStatus> {
        self.nodes.get(node).map(|p| p.status)
    }

    /// Forcibly stops every local node process, collecting (not
    /// short-circuiting on) individual failures.
    pub async fn kill_all(&mut self) -> Result<(), LifecycleError> {
        let mut first_err = None;
        for (node_ref, process) in self.nodes.iter_mut() {
            if let Err(e) = process.stop().await {
                error!(node = %node_ref, error = %e, "failed to kill local node");
                first_err.get_or_insert(e);
            }
        }
        self.nodes.clear();
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn stop(&mut self, node: &NodeRef) -> Result<(), LifecycleError> {
        if let Some(process) = self.nodes.get_mut(node) {
            process.stop().await?;
        }
        Ok(())
    }

    /// Restarts any node observed to have crashed. Intended to be driven by a
    /// periodic caller (the facade's background maintenance loop), not run
    /// internally: this crate owns no timer of its own.
    pub async fn reap_crashed(&mut self) {
        for (node_ref, process) in self.nodes.iter_mut() {
            if process.status == NodeStatus::Running && !process.is_alive() {
                warn!(node = %node_ref, "local node crashed");
                process.status = NodeStatus::Crashed;
            }
            if process.status == NodeStatus::Crashed {
                if let Err(e) = process.restart().await {
                    error!(node = %node_ref, error = %e, "failed to restart crashed local node");
                } else {
                    info!(node = %node_ref, "local node restarted after crash");
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec() -> SpawnSpec {
        SpawnSpec {
            executable_path: PathBuf::from("sleep"),
            port: Some(9000),
            hostname: None,
            debug: false,
            background: true,
        }
    }

    #[tokio::test]
    async fn unknown_node_is_not_local() {
        let fleet = LocalNodeFleet::new();
        assert!(!fleet.is_local(&NodeRef::new("127.0.0.1:1", "x")));
    }

    #[tokio::test]
    async fn kill_all_on_an_empty_fleet_is_a_no_op() {
        let mut fleet = LocalNodeFleet::new();
        fleet.kill_all().await.unwrap();
        assert!(fleet.is_empty());
    }

    #[tokio::test]
    async fn spawn_failure_does_not_register_the_node() {
        // "sleep" with no arguments exits immediately; the spawn interface
        // must surface that as an error rather than registering a dead node.
        let mut fleet = LocalNodeFleet::new();
        let err = fleet.spawn(spec()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::SpawnFailed(_, _)));
        assert!(fleet.is_empty());
    }
}
