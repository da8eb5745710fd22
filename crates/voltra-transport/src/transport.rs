//! The [`Transport`] trait and its typed convenience wrappers.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use voltra_types::NodeRef;

use crate::error::TransportError;

/// A connection-agnostic way to talk to a single remote node.
///
/// Implementations own whatever connection state they need (a
/// [`crate::pool::ConnectionPool`] in the TCP case, nothing at all in the
/// in-memory test double). Callers never see a connection object directly;
/// they address every call by [`NodeRef`] and the implementation resolves
/// that to a live connection, lazily establishing one if needed.
///
/// The trait is kept at the byte level so it stays object-safe; typed
/// request/reply is layered on top by [`send`] and [`request`].
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Sends `payload` to `node` without waiting for a reply.
    async fn send_bytes(&self, node: &NodeRef, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Sends `payload` to `node` and waits up to `timeout` for a reply.
    ///
    /// A [`TransportError::Remote`] means the node replied with an
    /// application error; everything else means no interpretable reply
    /// arrived at all.
    async fn request_bytes(
        &self,
        node: &NodeRef,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

/// Serializes `message` with `postcard` and forwards it via [`Transport::send_bytes`].
pub async fn send<T: Serialize + Sync>(
    transport: &dyn Transport,
    node: &NodeRef,
    message: &T,
) -> Result<(), TransportError> {
    let payload = postcard::to_allocvec(message)?;
    transport.send_bytes(node, payload).await
}

/// Serializes `request`, dispatches it, and decodes the reply as `Reply`.
pub async fn request<Req: Serialize + Sync, Reply: DeserializeOwned>(
    transport: &dyn Transport,
    node: &NodeRef,
    request: &Req,
    timeout: Duration,
) -> Result<Reply, TransportError> {
    let payload = postcard::to_allocvec(request)?;
    let reply_bytes = transport.request_bytes(node, payload, timeout).await?;
    let reply = postcard::from_bytes(&reply_bytes)?;
    Ok(reply)
}
