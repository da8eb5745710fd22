//! TCP-backed [`Transport`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use voltra_types::NodeRef;

use crate::error::TransportError;
use crate::framing::{read_frame, write_frame};
use crate::pool::ConnectionPool;
use crate::transport::Transport;

/// Talks to remote nodes over pooled, length-framed TCP connections.
#[derive(Debug, Default)]
pub struct TcpTransport {
    pool: ConnectionPool,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            pool: ConnectionPool::new(),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send_bytes(&self, node: &NodeRef, payload: Vec<u8>) -> Result<(), TransportError> {
        debug!(%node, bytes = payload.len(), "sending fire-and-forget frame");
        self.pool
            .with_connection(node, |stream| {
                Box::pin(async move { write_frame(stream, &payload).await })
            })
            .await
    }

    async fn request_bytes(
        &self,
        node: &NodeRef,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        debug!(%node, bytes = payload.len(), ?timeout, "sending request frame");
        self.pool
            .with_connection(node, |stream| {
                Box::pin(async move {
                    write_frame(stream, &payload).await?;
                    tokio::time::timeout(timeout, read_frame(stream))
                        .await
                        .map_err(|_| TransportError::Timeout)?
                })
            })
            .await
    }
}
