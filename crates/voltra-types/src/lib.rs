//! Core data model for the Voltra cluster controller.
//!
//! This crate has no network or filesystem dependencies of its own: it defines
//! the values that flow between [`voltra-transport`], [`voltra-cluster`],
//! [`voltra-lifecycle`], and [`voltra-process`], so that those crates can
//! exchange them without depending on each other's internals.
//!
//! [`voltra-transport`]: https://docs.rs/voltra-transport
//! [`voltra-cluster`]: https://docs.rs/voltra-cluster
//! [`voltra-lifecycle`]: https://docs.rs/voltra-lifecycle
//! [`voltra-process`]: https://docs.rs/voltra-process

mod computation;
mod ids;
mod node;
mod process;
mod view;

pub use computation::{ComputationImage, Dependency};
pub use ids::{ClientId, DeploymentId, ProcessId, StoreId};
pub use node::{NodeInfo, NodeRef, NodeRole, Permission};
pub use process::{ErrorInfo, LogEntry, ProcessRecord, ProcessStatus};
pub use view::{BootConfiguration, ClusterView, ClusterViewError};
