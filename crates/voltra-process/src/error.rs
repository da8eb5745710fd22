use voltra_types::ProcessId;

/// Failures surfaced by [`crate::manager::ProcessManager`] and
/// [`crate::handle::ProcessHandle`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("no such process: {0}")]
    NoSuchProcess(ProcessId),

    #[error("process {0} was killed")]
    ProcessKilled(ProcessId),

    #[error("timed out waiting for process {0} to complete")]
    AwaitTimeout(ProcessId),

    #[error("computation packaging failed: {0}")]
    CompilationError(String),

    /// Raised synchronously by `CreateProcess`, before any network traffic,
    /// when the image's payload cannot round-trip through the wire codec.
    #[error("computation is not serializable: {0}")]
    ComputationNotSerializable(String),

    #[error(transparent)]
    Cluster(#[from] voltra_cluster::ClusterError),
}
