use voltra_types::NodeRef;

/// Failures surfaced by [`crate::controller::LifecycleController`] and the
/// local node fleet it owns.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// A precondition named in §4.F was not met; no side effect occurred.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("failed to spawn local node {0}: {1}")]
    SpawnFailed(NodeRef, String),

    #[error("local node {0} is already starting or running")]
    NodeAlreadyRunning(NodeRef),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Cluster(#[from] voltra_cluster::ClusterError),
}
