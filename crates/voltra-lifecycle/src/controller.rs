//! Orchestrates the boot/shutdown/attach lifecycle of a cluster deployment.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;
use voltra_cluster::{ClusterError, ProxyHandle, RpcReply, RpcRequest};
use voltra_transport::{Transport, TransportError};
use voltra_types::{
    BootConfiguration, ClientId, ClusterView, DeploymentId, NodeInfo, NodeRef, StoreId,
};

use crate::error::LifecycleError;
use crate::local_fleet::LocalNodeFleet;
use crate::local_node::SpawnSpec;

/// Computes the `failoverFactor`/`replicationFactor` defaults from §4.F:
/// `failoverFactor = min(nodeCount - 1, 2)` when not given; `replicationFactor
/// = 2` unless `failoverFactor = 0`, in which case `0`.
fn resolve_factors(node_count: usize, rf: Option<u32>, ff: Option<u32>) -> (u32, u32) {
    let failover_factor = ff.unwrap_or_else(|| node_count.saturating_sub(1).min(2) as u32);
    let replication_factor = rf.unwrap_or(if failover_factor == 0 { 0 } else { 2 });
    (replication_factor, failover_factor)
}

/// Drives `Boot`/`BootInPlace`/`Shutdown`/`Reboot`/`Attach`/`Detach`/
/// `AttachLocal`/`Kill`, each a thin wrapper: check preconditions, submit to
/// the runtime proxy, interpret the reply.
pub struct LifecycleController {
    proxy: ProxyHandle,
    client_id: ClientId,
    transport: Arc<dyn Transport>,
    per_attempt_timeout: Duration,
    fleet: Mutex<LocalNodeFleet>,
    /// The candidate set from the most recent successful `Boot`, kept around
    /// so `BootInPlace`/`Reboot` can reuse it. `None` means this cluster has
    /// never been booted by this controller; `BootInPlace` must fail rather
    /// than silently reconstructing a configuration from the current view.
    last_boot_candidates: Mutex<Option<Vec<NodeInfo>>>,
}

impl LifecycleController {
    pub fn new(
        proxy: ProxyHandle,
        client_id: ClientId,
        transport: Arc<dyn Transport>,
        per_attempt_timeout: Duration,
    ) -> Self {
        Self {
            proxy,
            client_id,
            transport,
            per_attempt_timeout,
            fleet: Mutex::new(LocalNodeFleet::new()),
            last_boot_candidates: Mutex::new(None),
        }
    }

    pub async fn boot(
        &self,
        candidates: Vec<NodeInfo>,
        replication_factor: Option<u32>,
        failover_factor: Option<u32>,
        store_id: Option<StoreId>,
    ) -> Result<(NodeRef, Vec<NodeRef>), LifecycleError> {
        let view = self.proxy.last_view().await?;
        if view.is_booted() {
            return Err(LifecycleError::PreconditionFailed("already active".into()));
        }

        let (rf, ff) = resolve_factors(candidates.len(), replication_factor, failover_factor);
        if candidates.len() < (rf as usize + 1).max(1) {
            return Err(LifecycleError::PreconditionFailed(format!(
                "need at least {} node(s) for replication factor {rf}, got {}",
                (rf as usize + 1).max(1),
                candidates.len()
            )));
        }

        // Route the dispatcher at the first candidate: the pre-boot view is a
        // placeholder and otherwise points nowhere useful.
        let bootstrap = candidates[0].node_ref.clone();
        let placeholder_store = store_id.clone().unwrap_or_else(|| view.store_id.clone());
        self.proxy
            .set_view(ClusterView::unbooted(bootstrap, placeholder_store))
            .await?;

        let cfg = BootConfiguration {
            nodes: candidates.iter().map(|n| n.node_ref.clone()).collect(),
            replication_factor: rf,
            failover_factor: ff,
            store_id,
        };
        let result = self
            .proxy
            .master_boot(self.client_id, cfg, candidates.clone())
            .await?;

        *self.last_boot_candidates.lock().await = Some(candidates);
        info!(master = %result.0, "cluster boot complete");
        Ok(result)
    }

    pub async fn boot_in_place(
        &self,
        replication_factor: Option<u32>,
        failover_factor: Option<u32>,
    ) -> Result<(NodeRef, Vec<NodeRef>), LifecycleError> {
        let candidates = self
            .last_boot_candidates
            .lock()
            .await
            .clone()
            .ok_or_else(|| {
                LifecycleError::PreconditionFailed("insufficient cluster information".into())
            })?;

        let view = self.proxy.last_view().await?;
        if view.is_booted() {
            return Err(LifecycleError::PreconditionFailed("already active".into()));
        }

        let (rf, ff) = resolve_factors(candidates.len(), replication_factor, failover_factor);
        let cfg = BootConfiguration {
            nodes: candidates.iter().map(|n| n.node_ref.clone()).collect(),
            replication_factor: rf,
            failover_factor: ff,
            store_id: Some(view.store_id.clone()),
        };
        let result = self
            .proxy
            .master_boot(self.client_id, cfg, candidates)
            .await?;
        info!(master = %result.0, "cluster rebooted in place");
        Ok(result)
    }

    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        let view = self.proxy.last_view().await?;
        if !view.is_booted() {
            return Err(LifecycleError::PreconditionFailed("not active".into()));
        }

        match self
            .proxy
            .remote(self.client_id, RpcRequest::ShutdownSync)
            .await?
        {
            RpcReply::Ack(_) => {
                let idle_view = ClusterView {
                    deployment_id: DeploymentId::UNBOOTED,
                    ..view
                };
                self.proxy.set_view(idle_view).await?;
                info!("cluster shut down");
                Ok(())
            }
            other => Err(LifecycleError::Cluster(ClusterError::MalformedReply {
                node: self.proxy.last_view().await?.master,
                reason: format!("ShutdownSync reply was not Ack: {other:?}"),
            })),
        }
    }

    pub async fn reboot(
        &self,
        replication_factor: Option<u32>,
        failover_factor: Option<u32>,
    ) -> Result<(NodeRef, Vec<NodeRef>), LifecycleError> {
        self.shutdown().await?;
        self.boot_in_place(replication_factor, failover_factor).await
    }

    pub async fn attach(&self, node: NodeRef) -> Result<(), LifecycleError> {
        let view = self.proxy.last_view().await?;
        if !view.is_booted() {
            return Err(LifecycleError::PreconditionFailed("not active".into()));
        }

        match self
            .proxy
            .remote(self.client_id, RpcRequest::Attach(node.clone()))
            .await?
        {
            RpcReply::Ack(_) => {
                let mut workers = view.workers.clone();
                workers.insert(node.clone());
                let new_view = ClusterView::new(
                    view.deployment_id,
                    view.master.clone(),
                    view.alts.clone(),
                    workers,
                    view.replication_factor,
                    view.failover_factor,
                    view.store_id.clone(),
                )
                .map_err(ClusterError::from)?;
                self.proxy.set_view(new_view).await?;
                info!(node = %node, "attached node");
                Ok(())
            }
            other => Err(LifecycleError::Cluster(ClusterError::MalformedReply {
                node: view.master,
                reason: format!("Attach reply was not Ack: {other:?}"),
            })),
        }
    }

    /// Sends `Detach` directly to `node`, bypassing the master entirely: per
    /// §4.F this is the one operation addressed straight at the node being
    /// removed rather than through the view's dispatch order.
    pub async fn detach(&self, node: NodeRef) -> Result<(), LifecycleError> {
        let view = self.proxy.last_view().await?;
        if !view.workers.contains(&node) {
            return Err(LifecycleError::PreconditionFailed(format!(
                "{node} is not a worker of the current view"
            )));
        }

        let envelope =
            voltra_cluster::RequestEnvelope::new(self.client_id, RpcRequest::Detach);
        let reply = voltra_transport::request::<_, RpcReply>(
            self.transport.as_ref(),
            &node,
            &envelope,
            self.per_attempt_timeout,
        )
        .await
        .map_err(|e| transport_to_lifecycle(&node, e))?;

        match reply {
            RpcReply::Ack(_) => {
                let mut workers = view.workers.clone();
                workers.remove(&node);
                let new_view = ClusterView::new(
                    view.deployment_id,
                    view.master.clone(),
                    view.alts.clone(),
                    workers,
                    view.replication_factor,
                    view.failover_factor,
                    view.store_id.clone(),
                )
                .map_err(ClusterError::from)?;
                self.proxy.set_view(new_view).await?;
                info!(node = %node, "detached node");
                Ok(())
            }
            other => Err(LifecycleError::Cluster(ClusterError::MalformedReply {
                node,
                reason: format!("Detach reply was not Ack: {other:?}"),
            })),
        }
    }

    /// Spawns `count` local worker processes from `spec_template`, assigning
    /// each a successive port if `spec_template.port` is set, then attaches
    /// each to the running cluster.
    pub async fn attach_local(
        &self,
        count: usize,
        spec_template: SpawnSpec,
    ) -> Result<Vec<NodeRef>, LifecycleError> {
        let mut attached = Vec::with_capacity(count);
        for i in 0..count {
            let spec = SpawnSpec {
                port: spec_template.port.map(|p| p + i as u16),
                ..spec_template.clone()
            };
            let node_ref = self.fleet.lock().await.spawn(spec).await?;
            self.attach(node_ref.clone()).await?;
            attached.push(node_ref);
        }
        Ok(attached)
    }

    /// Forcibly terminates every local node process and zeroes the view.
    /// Fails if any node in the current view was not spawned by this
    /// controller (a mixed local/remote deployment cannot be killed wholesale).
    pub async fn kill(&self) -> Result<(), LifecycleError> {
        let view = self.proxy.last_view().await?;
        let fleet = self.fleet.lock().await;
        let all_local = view
            .ordered_targets()
            .iter()
            .chain(view.workers.iter())
            .all(|n| fleet.is_local(n));
        if !all_local {
            return Err(LifecycleError::PreconditionFailed(
                "cluster has non-local nodes".into(),
            ));
        }
        drop(fleet);

        self.fleet.lock().await.kill_all().await?;
        let idle_view = ClusterView::unbooted(view.master.clone(), view.store_id.clone());
        self.proxy.set_view(idle_view).await?;
        info!("local cluster killed");
        Ok(())
    }
}

fn transport_to_lifecycle(node: &NodeRef, err: TransportError) -> LifecycleError {
    match err {
        TransportError::Remote(info) => LifecycleError::Cluster(ClusterError::Remote(info)),
        TransportError::Communication(msg) => {
            LifecycleError::Cluster(ClusterError::MalformedReply {
                node: node.clone(),
                reason: format!("communication error: {msg}"),
            })
        }
        TransportError::Timeout => LifecycleError::Cluster(ClusterError::ClusterUnreachable),
        TransportError::Codec(e) => LifecycleError::Cluster(ClusterError::MalformedReply {
            node: node.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use voltra_transport::testing::MockTransport;
    use voltra_types::{NodeRole, Permission, StoreId};

    fn node_info(id: &str, master_eligible: bool) -> NodeInfo {
        let mut perms = BTreeSet::new();
        perms.insert(if master_eligible {
            Permission::Master
        } else {
            Permission::Worker
        });
        NodeInfo {
            node_ref: NodeRef::new(format!("127.0.0.1:{id}"), id),
            role: NodeRole::Idle,
            permissions: perms,
            is_local: false,
            uri: format!("tcp://127.0.0.1:{id}"),
        }
    }

    fn controller(transport: MockTransport) -> LifecycleController {
        let transport = Arc::new(transport);
        let view = ClusterView::unbooted(NodeRef::new("127.0.0.1:0", "bootstrap"), StoreId::new("local"));
        let proxy = voltra_cluster::spawn(
            view,
            transport.clone(),
            ClientId::new(),
            Duration::from_millis(200),
            Duration::from_millis(200),
        );
        LifecycleController::new(proxy, ClientId::new(), transport, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn boot_in_place_without_a_prior_boot_is_rejected() {
        let ctl = controller(MockTransport::new());
        let err = ctl.boot_in_place(None, None).await.unwrap_err();
        assert!(matches!(err, LifecycleError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn boot_with_too_few_nodes_for_replication_factor_is_rejected() {
        let ctl = controller(MockTransport::new());
        let candidates = vec![node_info("1", true)];
        let err = ctl
            .boot(candidates, Some(2), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn shutdown_on_unbooted_cluster_is_rejected() {
        let ctl = controller(MockTransport::new());
        let err = ctl.shutdown().await.unwrap_err();
        assert!(matches!(err, LifecycleError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn detach_requires_node_to_be_a_current_worker() {
        let ctl = controller(MockTransport::new());
        let err = ctl
            .detach(NodeRef::new("127.0.0.1:9", "9"))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn kill_rejects_a_cluster_with_no_locally_spawned_nodes() {
        let ctl = controller(MockTransport::new());
        // The placeholder master is the only node `ordered_targets` yields
        // here, and it was never spawned by the fleet, so this must reject.
        let err = ctl.kill().await.unwrap_err();
        assert!(matches!(err, LifecycleError::PreconditionFailed(_)));
    }
}
