//! A single locally-spawned node process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{info, warn};
use voltra_types::NodeRef;

use crate::error::LifecycleError;

/// Status of a locally-spawned node process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Stopped,
    Starting,
    Running,
    Crashed,
}

/// Parameters for spawning a local node, mirroring the `Spawn` interface
/// (§6): `(execPath, port?, hostname?, debug, background)`.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub executable_path: PathBuf,
    pub port: Option<u16>,
    pub hostname: Option<String>,
    pub debug: bool,
    pub background: bool,
}

/// A managed local node process, started via the spawn interface and
/// supervised by [`crate::local_fleet::LocalNodeFleet`].
pub struct NodeProcess {
    pub node_ref: NodeRef,
    spec: SpawnSpec,
    process: Option<Child>,
    pub status: NodeStatus,
    pub restart_count: usize,
}

impl NodeProcess {
    pub fn new(node_ref: NodeRef, spec: SpawnSpec) -> Self {
        Self {
            node_ref,
            spec,
            process: None,
            status: NodeStatus::Stopped,
            restart_count: 0,
        }
    }

    pub async fn start(&mut self) -> Result<(), LifecycleError> {
        if matches!(self.status, NodeStatus::Starting | NodeStatus::Running) {
            return Err(LifecycleError::NodeAlreadyRunning(self.node_ref.clone()));
        }

        self.status = NodeStatus::Starting;
        let mut command = Command::new(&self.spec.executable_path);
        if let Some(port) = self.spec.port {
            command.arg("--port").arg(port.to_string());
        }
        if let Some(hostname) = &self.spec.hostname {
            command.arg("--hostname").arg(hostname);
        }
        if self.spec.debug {
            command.arg("--debug");
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = command
            .spawn()
            .map_err(|e| LifecycleError::SpawnFailed(self.node_ref.clone(), e.to_string()))?;
        self.process = Some(child);

        // A local process that exits within this window is almost always a
        // misconfiguration (bad executable path, port in use); give it a
        // moment to fail fast rather than declaring success prematurely.
        sleep(Duration::from_millis(200)).await;

        if self.is_alive() {
            self.status = NodeStatus::Running;
            info!(node = %self.node_ref, "local node started");
            Ok(())
        } else {
            self.status = NodeStatus::Crashed;
            Err(LifecycleError::SpawnFailed(
                self.node_ref.clone(),
                "process exited immediately after spawn".into(),
            ))
        }
    }

    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        let Some(mut child) = self.process.take() else {
            self.status = NodeStatus::Stopped;
            return Ok(());
        };
        let _ = child.kill().await;
        match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            Ok(Ok(_)) | Err(_) => {
                self.status = NodeStatus::Stopped;
                info!(node = %self.node_ref, "local node stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                self.status = NodeStatus::Stopped;
                Err(LifecycleError::Io(e))
            }
        }
    }

    pub fn is_alive(&mut self) -> bool {
        match &mut self.process {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Restarts a crashed node with exponential backoff, capped at 32s.
    pub async fn restart(&mut self) -> Result<(), LifecycleError> {
        if self.status != NodeStatus::Crashed {
            return Ok(());
        }
        self.restart_count += 1;
        let backoff = Duration::from_secs(2u64.pow(self.restart_count.min(5) as u32));
        warn!(node = %self.node_ref, attempt = self.restart_count, backoff_secs = backoff.as_secs(), "restarting crashed local node");
        sleep(backoff).await;
        self.start().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder_spec() -> SpawnSpec {
        SpawnSpec {
            executable_path: PathBuf::from("sleep"),
            port: None,
            hostname: None,
            debug: false,
            background: true,
        }
    }

    fn node(id: &str) -> NodeRef {
        NodeRef::new(format!("127.0.0.1:{id}"), id)
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let mut proc = NodeProcess::new(node("0"), SpawnSpec {
            executable_path: PathBuf::from("sleep"),
            port: None,
            hostname: None,
            debug: false,
            background: true,
        });
        // "sleep" with no args exits immediately, so start() itself fails
        // with SpawnFailed; the point under test is that a process already
        // in Starting/Running is rejected, not that this placeholder binary
        // stays up.
        let _ = proc.start().await;
        proc.status = NodeStatus::Running;
        let err = proc.start().await.unwrap_err();
        assert!(matches!(err, LifecycleError::NodeAlreadyRunning(_)));
    }

    #[tokio::test]
    async fn stop_on_never_started_process_is_a_no_op() {
        let mut proc = NodeProcess::new(node("0"), placeholder_spec());
        proc.stop().await.unwrap();
        assert_eq!(proc.status, NodeStatus::Stopped);
    }
}
