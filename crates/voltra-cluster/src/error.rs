use voltra_types::{ClusterViewError, ErrorInfo, NodeRef};

/// Failures the dispatcher or runtime proxy can surface to a caller.
///
/// `Remote` and the others are distinguished deliberately: only
/// `Remote`-free exhaustion reaches `NoMaster`/`ClusterUnreachable`, and
/// [`Self::is_retryable`] documents which of these a higher layer may retry
/// again itself (none of them — by the time a `ClusterError` exists the
/// dispatcher has already exhausted its own retries).
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("no master available in the current view")]
    NoMaster,

    #[error("cluster unreachable: every target failed")]
    ClusterUnreachable,

    #[error("no node in the boot configuration is eligible to become master")]
    NoEligibleMaster,

    /// The cluster replied with an application error. Preserved verbatim.
    #[error("remote error: {}", .0.message)]
    Remote(ErrorInfo),

    #[error("malformed reply from {node}: {reason}")]
    MalformedReply { node: NodeRef, reason: String },

    #[error("invalid cluster view: {0}")]
    View(#[from] ClusterViewError),

    #[error("runtime proxy has been terminated")]
    ProxyTerminated,
}
