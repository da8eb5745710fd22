//! In-memory [`Transport`] double for exercising dispatch logic without a socket.
//!
//! Gated behind the `test-util` feature so dependent crates can pull it into
//! their `dev-dependencies` without shipping it in a release build.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use voltra_types::{ErrorInfo, NodeRef};

use crate::error::TransportError;
use crate::transport::Transport;

/// The scripted outcome of a single mock call.
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(Vec<u8>),
    Fail(MockFailure),
}

#[derive(Debug, Clone)]
pub enum MockFailure {
    Communication(String),
    Timeout,
    Remote(ErrorInfo),
}

impl From<MockFailure> for TransportError {
    fn from(failure: MockFailure) -> Self {
        match failure {
            MockFailure::Communication(msg) => TransportError::Communication(msg),
            MockFailure::Timeout => TransportError::Timeout,
            MockFailure::Remote(info) => TransportError::Remote(info),
        }
    }
}

/// A [`Transport`] whose per-node responses are scripted ahead of time.
///
/// Each node has a queue of [`Scripted`] outcomes consumed in order; a node
/// with an empty queue fails every call with `MockFailure::Communication`,
/// simulating an unreachable node.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    scripts: Arc<Mutex<HashMap<NodeRef, Vec<Scripted>>>>,
    sent: Arc<Mutex<Vec<(NodeRef, Vec<u8>)>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `outcome` as the next response `node` will give.
    pub async fn script(&self, node: NodeRef, outcome: Scripted) {
        self.scripts.lock().await.entry(node).or_default().push(outcome);
    }

    /// Every payload handed to `send_bytes` or `request_bytes`, in call order.
    pub async fn sent_messages(&self) -> Vec<(NodeRef, Vec<u8>)> {
        self.sent.lock().await.clone()
    }

    async fn next_outcome(&self, node: &NodeRef) -> Option<Scripted> {
        let mut scripts = self.scripts.lock().await;
        let queue = scripts.get_mut(node)?;
        if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_bytes(&self, node: &NodeRef, payload: Vec<u8>) -> Result<(), TransportError> {
        self.sent.lock().await.push((node.clone(), payload));
        Ok(())
    }

    async fn request_bytes(
        &self,
        node: &NodeRef,
        payload: Vec<u8>,
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.sent.lock().await.push((node.clone(), payload));
        match self.next_outcome(node).await {
            Some(Scripted::Reply(bytes)) => Ok(bytes),
            Some(Scripted::Fail(failure)) => Err(failure.into()),
            None => Err(TransportError::Communication(format!(
                "mock transport has no script left for {node}"
            ))),
        }
    }
}
