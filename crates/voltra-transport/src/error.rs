//! Transport failure classification.
//!
//! The distinction between [`TransportError::Communication`]/[`TransportError::Timeout`]
//! and [`TransportError::Remote`] is load-bearing: the former are retried against
//! the next target in a failover dispatch, the latter is returned to the caller
//! as-is.

use voltra_types::ErrorInfo;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established or was lost mid-request.
    #[error("communication failure: {0}")]
    Communication(String),

    /// No reply arrived within the caller-supplied deadline.
    #[error("request timed out")]
    Timeout,

    /// The remote node replied with an application-level error. Not retried.
    #[error("remote error: {}", .0.message)]
    Remote(ErrorInfo),

    /// Covers both serializing the outgoing payload and parsing the reply.
    #[error("wire codec error: {0}")]
    Codec(#[from] postcard::Error),
}

impl TransportError {
    /// Whether a failover dispatcher should try the next target after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Communication(_) | TransportError::Timeout
        )
    }
}
