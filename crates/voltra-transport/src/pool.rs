//! Process-wide registry of open connections, keyed by node address.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::net::TcpStream;
use tokio::sync::Mutex;
use voltra_types::NodeRef;

use crate::error::TransportError;

/// A `tokio::sync::Mutex`-guarded map from node to live connection.
///
/// A missing entry is lazily connected on first use; a connection that fails
/// mid-request is dropped from the map so the next call reconnects rather
/// than retrying a dead socket.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    connections: Mutex<HashMap<NodeRef, TcpStream>>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `op` against a live connection to `node`, connecting first if
    /// necessary. On failure the connection is evicted so the next call
    /// reconnects instead of reusing a socket that just proved dead.
    pub async fn with_connection<F, T>(&self, node: &NodeRef, op: F) -> Result<T, TransportError>
    where
        F: for<'a> FnOnce(
            &'a mut TcpStream,
        ) -> Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>,
    {
        let mut connections = self.connections.lock().await;
        if !connections.contains_key(node) {
            let stream = TcpStream::connect(node.address())
                .await
                .map_err(|e| TransportError::Communication(e.to_string()))?;
            connections.insert(node.clone(), stream);
        }
        let stream = connections.get_mut(node).expect("just inserted above");
        match op(stream).await {
            Ok(value) => Ok(value),
            Err(err) => {
                connections.remove(node);
                Err(err)
            }
        }
    }

    /// Drops any cached connection to `node`, forcing a fresh connect next use.
    pub async fn evict(&self, node: &NodeRef) {
        self.connections.lock().await.remove(node);
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn evicting_an_unknown_node_is_a_no_op() {
        let pool = ConnectionPool::new();
        pool.evict(&NodeRef::new("127.0.0.1:1", "n")).await;
        assert_eq!(pool.len().await, 0);
    }
}
