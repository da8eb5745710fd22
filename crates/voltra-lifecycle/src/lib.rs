//! Cluster lifecycle orchestration: boot, shutdown, attach/detach, and the
//! local node processes a controller running in local mode owns directly.
//!
//! This crate has no opinion on dispatch or failover (`voltra-cluster`) or on
//! metadata caching (`voltra-cache`); it only sequences the lifecycle
//! operations of §4.F and supervises locally-spawned node processes.

mod controller;
mod error;
mod local_fleet;
mod local_node;

pub use controller::LifecycleController;
pub use error::LifecycleError;
pub use local_fleet::LocalNodeFleet;
pub use local_node::{NodeProcess, NodeStatus, SpawnSpec};
