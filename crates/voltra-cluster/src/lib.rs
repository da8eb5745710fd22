//! Cluster RPC vocabulary, master-failover dispatch, and the runtime proxy.
//!
//! This crate has no opinion on how a `ClusterView` is obtained in the first
//! place (that's `voltra-lifecycle`) or on local node processes; it only
//! knows how to talk to nodes a view already names and how to keep that view
//! current in the face of failover.

mod dispatcher;
mod error;
mod message;
mod proxy;

pub use dispatcher::{DispatchOutcome, FailoverDispatcher};
pub use error::ClusterError;
pub use message::{
    Ack, ClusterDeploymentInfo, NodeDeploymentInfo, PerformanceSample, RequestEnvelope, RpcReply,
    RpcRequest,
};
pub use proxy::{spawn, ProxyHandle};
