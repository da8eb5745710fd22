//! The two metadata caches the core is permitted to serve stale (§4.E).

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use voltra_cluster::{ClusterDeploymentInfo, ClusterError, NodeDeploymentInfo, ProxyHandle, RpcReply, RpcRequest};
use voltra_types::{ClientId, NodeRef};

use crate::ttl_cache::{Cached, TtlCache};

/// Default TTL per §4.E: 2000 ms.
pub const DEFAULT_TTL: Duration = Duration::from_millis(2000);

/// Caches `GetClusterDeploymentInfo` and `GetNodeDeploymentInfo` replies,
/// routing misses through the runtime proxy (component D) and never
/// tolerating staleness anywhere else in the core.
pub struct CachedMetadata {
    proxy: ProxyHandle,
    client_id: ClientId,
    ttl: Duration,
    cluster_info: TtlCache<ClusterDeploymentInfo>,
    node_info: Mutex<HashMap<NodeRef, TtlCache<NodeDeploymentInfo>>>,
}

impl CachedMetadata {
    pub fn new(proxy: ProxyHandle, client_id: ClientId) -> Self {
        Self::with_ttl(proxy, client_id, DEFAULT_TTL)
    }

    pub fn with_ttl(proxy: ProxyHandle, client_id: ClientId, ttl: Duration) -> Self {
        Self {
            proxy,
            client_id,
            ttl,
            cluster_info: TtlCache::new(ttl),
            node_info: Mutex::new(HashMap::new()),
        }
    }

    pub async fn cluster_deployment_info(
        &self,
        with_perf: bool,
    ) -> Result<Cached<ClusterDeploymentInfo>, ClusterError> {
        self.cluster_info
            .get(|| async {
                match self
                    .proxy
                    .remote(
                        self.client_id,
                        RpcRequest::GetClusterDeploymentInfo { with_perf },
                    )
                    .await?
                {
                    RpcReply::ClusterInfo(info) => Ok(info),
                    other => Err(ClusterError::MalformedReply {
                        node: NodeRef::new("master", "master"),
                        reason: format!("expected ClusterInfo, got {other:?}"),
                    }),
                }
            })
            .await
    }

    pub async fn node_deployment_info(
        &self,
        node: &NodeRef,
        with_perf: bool,
    ) -> Result<Cached<NodeDeploymentInfo>, ClusterError> {
        let mut caches = self.node_info.lock().await;
        let entry = caches
            .entry(node.clone())
            .or_insert_with(|| TtlCache::new(self.ttl));

        entry
            .get(|| async {
                match self
                    .proxy
                    .remote(
                        self.client_id,
                        RpcRequest::GetNodeDeploymentInfo { with_perf },
                    )
                    .await?
                {
                    RpcReply::NodeInfo(info) => Ok(info),
                    other => Err(ClusterError::MalformedReply {
                        node: node.clone(),
                        reason: format!("expected NodeInfo, got {other:?}"),
                    }),
                }
            })
            .await
    }

    /// Forces the next access to both caches to refetch, regardless of TTL.
    /// Used after lifecycle operations that are known to change membership.
    pub async fn invalidate_all(&self) {
        self.cluster_info.invalidate().await;
        self.node_info.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use voltra_transport::testing::MockTransport;
    use voltra_types::{ClusterView, DeploymentId, StoreId};

    fn node(id: &str) -> NodeRef {
        NodeRef::new(format!("127.0.0.1:{id}"), id)
    }

    fn encode(reply: &RpcReply) -> Vec<u8> {
        postcard::to_allocvec(reply).unwrap()
    }

    async fn spawn_proxy(transport: MockTransport, master: NodeRef) -> ProxyHandle {
        let view = ClusterView::new(
            DeploymentId::new(),
            master,
            vec![],
            Default::default(),
            0,
            0,
            StoreId::new("local"),
        )
        .unwrap();
        voltra_cluster::spawn(
            view,
            Arc::new(transport),
            ClientId::new(),
            Duration::from_millis(200),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn cluster_info_is_fetched_once_within_ttl() {
        let transport = MockTransport::new();
        let master = node("1");
        let info = ClusterDeploymentInfo {
            deployment_id: DeploymentId::new(),
            node_count: 3,
            uptime_ms: 10,
            performance: None,
        };
        transport
            .script(
                master.clone(),
                voltra_transport::testing::Scripted::Reply(encode(&RpcReply::ClusterInfo(
                    info.clone(),
                ))),
            )
            .await;
        let proxy = spawn_proxy(transport.clone(), master).await;
        let cache = CachedMetadata::with_ttl(proxy, ClientId::new(), Duration::from_secs(60));

        let first = cache.cluster_deployment_info(false).await.unwrap();
        let second = cache.cluster_deployment_info(false).await.unwrap();
        assert_eq!(first.value, info);
        assert!(!second.is_stale);
        assert_eq!(transport.sent_messages().await.len(), 1);
    }
}
