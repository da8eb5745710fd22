//! The RPC vocabulary the controller speaks to the cluster.
//!
//! The cluster side that answers these messages is out of scope; this module
//! only fixes the shape both ends agree on.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voltra_types::{
    BootConfiguration, ClientId, ComputationImage, DeploymentId, ErrorInfo, LogEntry, NodeRef,
    NodeRole, ProcessId, ProcessRecord,
};

/// An empty acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub cpu_percent: f32,
    pub memory_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDeploymentInfo {
    pub deployment_id: DeploymentId,
    pub node_count: usize,
    pub uptime_ms: u64,
    pub performance: Option<PerformanceSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDeploymentInfo {
    pub node_ref: NodeRef,
    pub role: NodeRole,
    pub performance: Option<PerformanceSample>,
}

/// The body of a single RPC exchange. See §6 of the controller's design for
/// the direction and reply each variant expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RpcRequest {
    Ping { silent: bool },
    GetAllNodes,
    GetClusterDeploymentInfo { with_perf: bool },
    GetNodeDeploymentInfo { with_perf: bool },
    MasterBoot(BootConfiguration),
    ShutdownSync,
    Shutdown,
    Attach(NodeRef),
    Detach,
    CreateProcess(ComputationImage),
    KillProcess(ProcessId),
    GetProcess(ProcessId),
    GetAllProcesses,
    ClearProcessInfo(Option<ProcessId>),
    /// `None` requests the full cluster-wide dump (§6); `Some(id)` scopes it
    /// to the log entries accumulated for a single process (§4.G).
    GetLogDump(Option<ProcessId>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RpcReply {
    Pong,
    Nodes(Vec<NodeRef>),
    ClusterInfo(ClusterDeploymentInfo),
    NodeInfo(NodeDeploymentInfo),
    MasterBooted { master: NodeRef, alts: Vec<NodeRef> },
    Ack(Ack),
    ProcessCreated(ProcessId),
    Process(ProcessRecord),
    Processes(Vec<ProcessRecord>),
    Logs(Vec<LogEntry>),
    /// An application-level failure the cluster side chose to report as a
    /// reply rather than refusing the connection. Carries the same
    /// [`ErrorInfo`] payload `TransportError::Remote` carries, so the
    /// classification survives decoding instead of being indistinguishable
    /// from a successful reply once it crosses the wire.
    Error(ErrorInfo),
}

/// Every outgoing request is wrapped in an envelope carrying the
/// `(clientId, requestId)` pair the cluster side uses to deduplicate retried
/// sends. The envelope is built once per logical request and reused verbatim
/// across every failover attempt, so a retry is recognizably the same
/// request rather than a fresh one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub client_id: ClientId,
    pub request_id: Uuid,
    pub request: RpcRequest,
}

impl RequestEnvelope {
    pub fn new(client_id: ClientId, request: RpcRequest) -> Self {
        Self {
            client_id,
            request_id: Uuid::new_v4(),
            request,
        }
    }
}
