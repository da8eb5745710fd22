//! # Voltra
//!
//! Client-side cluster controller for a distributed cloud-computation
//! runtime: connects to, boots, and administers a multi-node compute
//! cluster, submits cloud processes, and keeps the client in sync with
//! cluster membership via a single-threaded runtime proxy with failover.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              Voltra                                 │
//! │  Settings → Transport → RuntimeProxy → LifecycleController          │
//! │                              │          ProcessManager              │
//! │                              └──────────CachedMetadata              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use voltra::Voltra;
//! use voltra_types::NodeRef;
//!
//! let bootstrap = NodeRef::new("127.0.0.1:9531", "n1");
//! let controller = Voltra::connect(bootstrap).await?;
//! controller.boot(candidates, None, None, None).await?;
//! controller.ping(false).await?;
//! controller.shutdown().await?;
//! controller.dispose().await;
//! ```

mod controller;
mod error;

pub use controller::Voltra;
pub use error::{ControllerError, Result};

// Re-export the data model and error taxonomy callers need to name.
pub use voltra_types::{
    BootConfiguration, ClientId, ClusterView, ClusterViewError, ComputationImage, Dependency,
    DeploymentId, ErrorInfo, LogEntry, NodeInfo, NodeRef, NodeRole, Permission, ProcessId,
    ProcessRecord, ProcessStatus, StoreId,
};

// Re-export settings and the store capability consumers need to wire in.
pub use voltra_config::{
    ConfigError, ConfigLoader, NullStoreRegistry, Paths, Settings, StoreDescriptor, StoreInfo,
    StoreRegistry,
};

// Re-export the transport seam, for callers that wire in their own.
pub use voltra_transport::{Transport, TransportError};

// Re-export cluster-facing types useful to callers reading a view or reply.
pub use voltra_cluster::{
    ClusterDeploymentInfo, ClusterError, NodeDeploymentInfo, PerformanceSample,
};

// Re-export caching types so callers can inspect staleness.
pub use voltra_cache::Cached;

// Re-export lifecycle types for local-mode deployments.
pub use voltra_lifecycle::{LifecycleError, NodeStatus, SpawnSpec};

// Re-export process submission types.
pub use voltra_process::{
    ComputationPackager, ComputationSource, Diagnostic, PackagedComputation, ProcessError,
    ProcessHandle, Severity,
};
