//! The composed error type callers of the public API match on.

use thiserror::Error;

/// Every failure a [`crate::Voltra`] operation can surface.
///
/// Each subordinate crate keeps its own closed error enum scoped to its own
/// concerns; this type composes them via `#[from]` so a caller only ever
/// needs to match one type, per §7's error taxonomy.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Transport(#[from] voltra_transport::TransportError),

    #[error(transparent)]
    Cluster(#[from] voltra_cluster::ClusterError),

    #[error(transparent)]
    Lifecycle(#[from] voltra_lifecycle::LifecycleError),

    #[error(transparent)]
    Process(#[from] voltra_process::ProcessError),

    #[error(transparent)]
    Config(#[from] voltra_config::ConfigError),

    /// Any operation invoked after [`crate::Voltra::dispose`] has run.
    #[error("controller has been disposed")]
    ObjectDisposed,
}

pub type Result<T> = std::result::Result<T, ControllerError>;
