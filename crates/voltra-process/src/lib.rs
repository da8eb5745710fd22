//! Cloud process submission, tracking, and computation packaging.
//!
//! This crate has no opinion on dispatch or failover (`voltra-cluster`); it
//! only knows how to turn a computation into a wire-ready image and how to
//! track the resulting process id through to a terminal state.

mod error;
mod handle;
mod manager;
mod packager;

pub use error::ProcessError;
pub use handle::ProcessHandle;
pub use manager::ProcessManager;
pub use packager::{ComputationPackager, ComputationSource, Diagnostic, PackagedComputation, Severity};
