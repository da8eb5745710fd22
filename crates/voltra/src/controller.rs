//! The public entry point: wires Settings through transport, dispatch,
//! caching, lifecycle, and process management, and owns disposal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;
use voltra_cache::{CachedMetadata, Cached};
use voltra_cluster::{
    ClusterDeploymentInfo, NodeDeploymentInfo, ProxyHandle, RpcReply, RpcRequest,
};
use voltra_config::Settings;
use voltra_lifecycle::{LifecycleController, SpawnSpec};
use voltra_process::{
    ComputationPackager, ComputationSource, PackagedComputation, ProcessHandle, ProcessManager,
};
use voltra_transport::{TcpTransport, Transport};
use voltra_types::{
    ClientId, ClusterView, NodeInfo, NodeRef, ProcessId, StoreId,
};

use crate::error::{ControllerError, Result};

/// A connected controller for one cluster deployment.
///
/// Cheap to clone: clones share the same underlying state, including
/// disposal. Disposing any clone disposes all of them.
#[derive(Clone)]
pub struct Voltra {
    inner: Arc<Inner>,
}

struct Inner {
    settings: Settings,
    client_id: ClientId,
    transport: Arc<dyn Transport>,
    proxy: ProxyHandle,
    metadata: CachedMetadata,
    lifecycle: LifecycleController,
    processes: ProcessManager,
    disposed: AtomicBool,
}

impl Voltra {
    /// Resolves `Settings` through the usual layered sources and connects
    /// with a default TCP transport, using `bootstrap` as the placeholder
    /// master of the pre-boot view.
    pub async fn connect(bootstrap: NodeRef) -> Result<Self> {
        let settings = voltra_config::ConfigLoader::new().load()?;
        Self::connect_with(settings, Arc::new(TcpTransport::new()), bootstrap).await
    }

    /// Connects using caller-supplied `settings` and `transport`, e.g. a
    /// [`voltra_transport::testing::MockTransport`] in tests.
    pub async fn connect_with(
        settings: Settings,
        transport: Arc<dyn Transport>,
        bootstrap: NodeRef,
    ) -> Result<Self> {
        voltra_config::Paths::recreate_working_directory(settings.working_directory().await)?;

        let client_id = settings.client_id().await;
        let store_id: StoreId = settings.default_store_provider().await.store_id();
        let timeout = settings.default_timeout().await;

        let initial_view = ClusterView::unbooted(bootstrap, store_id);
        let proxy = voltra_cluster::spawn(initial_view, transport.clone(), client_id, timeout, timeout);

        let metadata = CachedMetadata::new(proxy.clone(), client_id);
        let lifecycle = LifecycleController::new(proxy.clone(), client_id, transport.clone(), timeout);
        let processes = ProcessManager::new(proxy.clone(), client_id);

        info!(%client_id, "controller connected");

        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                client_id,
                transport,
                proxy,
                metadata,
                lifecycle,
                processes,
                disposed: AtomicBool::new(false),
            }),
        })
    }

    fn check_disposed(&self) -> Result<()> {
        if self.inner.disposed.load(Ordering::Acquire) {
            Err(ControllerError::ObjectDisposed)
        } else {
            Ok(())
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.inner.client_id
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// The controller's current view of cluster membership. Never suspends
    /// on the network: this is a local read of the runtime proxy's state.
    pub async fn last_view(&self) -> Result<ClusterView> {
        self.check_disposed()?;
        Ok(self.inner.proxy.last_view().await?)
    }

    pub async fn ping(&self, silent: bool) -> Result<()> {
        self.check_disposed()?;
        match self
            .inner
            .proxy
            .remote(self.inner.client_id, RpcRequest::Ping { silent })
            .await?
        {
            RpcReply::Pong => Ok(()),
            other => Err(ControllerError::Cluster(
                voltra_cluster::ClusterError::MalformedReply {
                    node: self.inner.proxy.last_view().await?.master,
                    reason: format!("Ping reply was not Pong: {other:?}"),
                },
            )),
        }
    }

    pub async fn cluster_deployment_info(
        &self,
        with_perf: bool,
    ) -> Result<Cached<ClusterDeploymentInfo>> {
        self.check_disposed()?;
        Ok(self.inner.metadata.cluster_deployment_info(with_perf).await?)
    }

    pub async fn node_deployment_info(
        &self,
        node: &NodeRef,
        with_perf: bool,
    ) -> Result<Cached<NodeDeploymentInfo>> {
        self.check_disposed()?;
        Ok(self.inner.metadata.node_deployment_info(node, with_perf).await?)
    }

    pub async fn boot(
        &self,
        candidates: Vec<NodeInfo>,
        replication_factor: Option<u32>,
        failover_factor: Option<u32>,
        store_id: Option<StoreId>,
    ) -> Result<(NodeRef, Vec<NodeRef>)> {
        self.check_disposed()?;
        Ok(self
            .inner
            .lifecycle
            .boot(candidates, replication_factor, failover_factor, store_id)
            .await?)
    }

    pub async fn boot_in_place(
        &self,
        replication_factor: Option<u32>,
        failover_factor: Option<u32>,
    ) -> Result<(NodeRef, Vec<NodeRef>)> {
        self.check_disposed()?;
        Ok(self.inner.lifecycle.boot_in_place(replication_factor, failover_factor).await?)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.check_disposed()?;
        Ok(self.inner.lifecycle.shutdown().await?)
    }

    pub async fn reboot(
        &self,
        replication_factor: Option<u32>,
        failover_factor: Option<u32>,
    ) -> Result<(NodeRef, Vec<NodeRef>)> {
        self.check_disposed()?;
        Ok(self.inner.lifecycle.reboot(replication_factor, failover_factor).await?)
    }

    pub async fn attach(&self, node: NodeRef) -> Result<()> {
        self.check_disposed()?;
        Ok(self.inner.lifecycle.attach(node).await?)
    }

    pub async fn detach(&self, node: NodeRef) -> Result<()> {
        self.check_disposed()?;
        Ok(self.inner.lifecycle.detach(node).await?)
    }

    pub async fn attach_local(&self, count: usize, spec: SpawnSpec) -> Result<Vec<NodeRef>> {
        self.check_disposed()?;
        Ok(self.inner.lifecycle.attach_local(count, spec).await?)
    }

    /// Forcibly terminates every local node process and zeroes the view.
    pub async fn kill(&self) -> Result<()> {
        self.check_disposed()?;
        Ok(self.inner.lifecycle.kill().await?)
    }

    /// Packages `source` and submits it, failing synchronously before any
    /// network traffic if it cannot be serialized.
    pub async fn create_process(&self, source: ComputationSource) -> Result<ProcessHandle> {
        self.check_disposed()?;
        let PackagedComputation { image, .. } =
            ComputationPackager::new(self.inner.client_id).package(source)?;
        Ok(self.inner.processes.create_process(image).await?)
    }

    pub async fn kill_process(&self, id: ProcessId) -> Result<()> {
        self.check_disposed()?;
        Ok(self.inner.processes.kill(id).await?)
    }

    pub async fn get_process(&self, id: ProcessId) -> Result<ProcessHandle> {
        self.check_disposed()?;
        Ok(self.inner.processes.get(id).await?)
    }

    pub async fn get_all_processes(&self) -> Result<Vec<ProcessHandle>> {
        self.check_disposed()?;
        Ok(self.inner.processes.get_all().await?)
    }

    pub async fn clear_process_info(&self, id: ProcessId) -> Result<()> {
        self.check_disposed()?;
        Ok(self.inner.processes.clear_info(id).await?)
    }

    pub async fn clear_all_process_info(&self) -> Result<()> {
        self.check_disposed()?;
        Ok(self.inner.processes.clear_all_info().await?)
    }

    /// Idempotent best-effort teardown: terminates the runtime proxy and
    /// kills any local node processes this controller owns, swallowing
    /// transport errors. The working directory is left in place. Safe to
    /// call more than once; only the first call does anything.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.inner.lifecycle.kill().await;
        self.inner.proxy.terminate();
        info!(client_id = %self.inner.client_id, "controller disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltra_transport::testing::MockTransport;

    async fn connected(transport: MockTransport) -> (Voltra, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let settings = Settings::in_memory();
        settings
            .set_working_directory(temp_dir.path().to_path_buf())
            .await;
        let bootstrap = NodeRef::new("127.0.0.1:1", "1");
        let controller = Voltra::connect_with(settings, Arc::new(transport), bootstrap)
            .await
            .expect("failed to connect");
        (controller, temp_dir)
    }

    fn postcard_reply(reply: &RpcReply) -> Vec<u8> {
        postcard::to_allocvec(reply).unwrap()
    }

    #[tokio::test]
    async fn ping_succeeds_against_a_scripted_pong() {
        let transport = MockTransport::new();
        let master = NodeRef::new("127.0.0.1:1", "1");
        transport
            .script(master, voltra_transport::testing::Scripted::Reply(postcard_reply(&RpcReply::Pong)))
            .await;
        let (controller, _temp_dir) = connected(transport).await;

        controller.ping(false).await.expect("ping should succeed");
    }

    #[tokio::test]
    async fn operations_fail_with_object_disposed_after_dispose() {
        let (controller, _temp_dir) = connected(MockTransport::new()).await;

        controller.dispose().await;

        assert!(matches!(
            controller.last_view().await.unwrap_err(),
            ControllerError::ObjectDisposed
        ));
        assert!(matches!(
            controller.ping(false).await.unwrap_err(),
            ControllerError::ObjectDisposed
        ));
    }

    #[tokio::test]
    async fn disposing_twice_is_a_noop() {
        let (controller, _temp_dir) = connected(MockTransport::new()).await;

        controller.dispose().await;
        controller.dispose().await;

        assert!(matches!(
            controller.last_view().await.unwrap_err(),
            ControllerError::ObjectDisposed
        ));
    }

    #[tokio::test]
    async fn boot_with_too_few_nodes_propagates_as_a_lifecycle_precondition() {
        let (controller, _temp_dir) = connected(MockTransport::new()).await;

        let candidates = vec![NodeInfo {
            node_ref: NodeRef::new("127.0.0.1:2", "2"),
            role: voltra_types::NodeRole::Idle,
            permissions: std::iter::once(voltra_types::Permission::Master).collect(),
            is_local: false,
            uri: "tcp://127.0.0.1:2".to_string(),
        }];

        let err = controller.boot(candidates, Some(2), None, None).await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Lifecycle(voltra_lifecycle::LifecycleError::PreconditionFailed(_))
        ));
    }

    #[tokio::test]
    async fn recreates_the_working_directory_layout_on_connect() {
        let (_controller, temp_dir) = connected(MockTransport::new()).await;

        for subdir in ["assemblyCache", "localCache", "dependencyStage"] {
            assert!(temp_dir.path().join(subdir).is_dir());
        }
    }
}
