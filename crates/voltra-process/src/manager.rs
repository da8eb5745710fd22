//! Creates, tracks, and clears cloud process records.

use voltra_cluster::{ClusterError, ProxyHandle, RpcReply, RpcRequest};
use voltra_types::{ClientId, ComputationImage, ProcessId};

use crate::error::ProcessError;
use crate::handle::ProcessHandle;

/// The client-side entry point for submitting and tracking cloud processes.
pub struct ProcessManager {
    proxy: ProxyHandle,
    client_id: ClientId,
}

impl ProcessManager {
    pub fn new(proxy: ProxyHandle, client_id: ClientId) -> Self {
        Self { proxy, client_id }
    }

    /// Submits `image`, failing synchronously with `ComputationNotSerializable`
    /// before any network traffic if it cannot round-trip through the wire
    /// codec.
    pub async fn create_process(
        &self,
        image: ComputationImage,
    ) -> Result<ProcessHandle, ProcessError> {
        if postcard::to_allocvec(&image).is_err() {
            return Err(ProcessError::ComputationNotSerializable(
                "image failed to encode".into(),
            ));
        }

        match self
            .proxy
            .remote(self.client_id, RpcRequest::CreateProcess(image))
            .await?
        {
            RpcReply::ProcessCreated(id) => {
                Ok(ProcessHandle::new(id, self.proxy.clone(), self.client_id))
            }
            other => Err(self.malformed("CreateProcess", &other).await),
        }
    }

    pub async fn kill(&self, id: ProcessId) -> Result<(), ProcessError> {
        match self
            .proxy
            .remote(self.client_id, RpcRequest::KillProcess(id))
            .await?
        {
            RpcReply::Ack(_) => Ok(()),
            other => Err(self.malformed("KillProcess", &other).await),
        }
    }

    /// Resolves a handle for `id`. Fails `NoSuchProcess` if the cluster does
    /// not recognize it.
    pub async fn get(&self, id: ProcessId) -> Result<ProcessHandle, ProcessError> {
        match self.proxy.remote(self.client_id, RpcRequest::GetProcess(id)).await {
            Ok(RpcReply::Process(record)) => {
                Ok(ProcessHandle::new(record.id, self.proxy.clone(), self.client_id))
            }
            Ok(other) => Err(self.malformed("GetProcess", &other).await),
            Err(ClusterError::Remote(_)) => Err(ProcessError::NoSuchProcess(id)),
            Err(e) => Err(ProcessError::Cluster(e)),
        }
    }

    pub async fn get_all(&self) -> Result<Vec<ProcessHandle>, ProcessError> {
        match self
            .proxy
            .remote(self.client_id, RpcRequest::GetAllProcesses)
            .await?
        {
            RpcReply::Processes(records) => Ok(records
                .into_iter()
                .map(|r| ProcessHandle::new(r.id, self.proxy.clone(), self.client_id))
                .collect()),
            other => Err(self.malformed("GetAllProcesses", &other).await),
        }
    }

    /// Removes the persisted record for `id`. Only valid once the process has
    /// reached a terminal state; the cluster side enforces that.
    pub async fn clear_info(&self, id: ProcessId) -> Result<(), ProcessError> {
        match self
            .proxy
            .remote(self.client_id, RpcRequest::ClearProcessInfo(Some(id)))
            .await?
        {
            RpcReply::Ack(_) => Ok(()),
            other => Err(self.malformed("ClearProcessInfo", &other).await),
        }
    }

    pub async fn clear_all_info(&self) -> Result<(), ProcessError> {
        match self
            .proxy
            .remote(self.client_id, RpcRequest::ClearProcessInfo(None))
            .await?
        {
            RpcReply::Ack(_) => Ok(()),
            other => Err(self.malformed("ClearProcessInfo", &other).await),
        }
    }

    async fn malformed(&self, op: &str, reply: &RpcReply) -> ProcessError {
        let node = self
            .proxy
            .last_view()
            .await
            .map(|v| v.master)
            .unwrap_or_else(|_| voltra_types::NodeRef::new("unknown", "unknown"));
        ProcessError::Cluster(ClusterError::MalformedReply {
            node,
            reason: format!("{op} reply was not the expected variant: {reply:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use voltra_transport::testing::{MockFailure, MockTransport, Scripted};
    use voltra_types::{ClusterView, DeploymentId, NodeRef, StoreId};

    fn encode(reply: &RpcReply) -> Vec<u8> {
        postcard::to_allocvec(reply).unwrap()
    }

    fn manager(transport: MockTransport, master: NodeRef) -> ProcessManager {
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
        let proxy = voltra_cluster::spawn(
            view,
            Arc::new(transport),
            ClientId::new(),
            Duration::from_millis(200),
            Duration::from_millis(200),
        );
        ProcessManager::new(proxy, ClientId::new())
    }

    fn image() -> ComputationImage {
        ComputationImage {
            client_id: ClientId::new(),
            name: "n".into(),
            payload: vec![],
            return_type_tag: "unit".into(),
            dependencies: vec![],
        }
    }

    #[tokio::test]
    async fn create_process_returns_a_handle_bound_to_the_assigned_id() {
        let transport = MockTransport::new();
        let master = NodeRef::new("127.0.0.1:1", "1");
        let id = ProcessId::new();
        transport
            .script(master.clone(), Scripted::Reply(encode(&RpcReply::ProcessCreated(id))))
            .await;
        let mgr = manager(transport, master);
        let handle = mgr.create_process(image()).await.unwrap();
        assert_eq!(handle.id(), id);
    }

    #[tokio::test]
    async fn get_maps_a_remote_error_to_no_such_process() {
        let transport = MockTransport::new();
        let master = NodeRef::new("127.0.0.1:1", "1");
        transport
            .script(
                master.clone(),
                Scripted::Fail(MockFailure::Remote(voltra_types::ErrorInfo::new("unknown process"))),
            )
            .await;
        let mgr = manager(transport, master);
        let err = mgr.get(ProcessId::new()).await.unwrap_err();
        assert!(matches!(err, ProcessError::NoSuchProcess(_)));
    }
}
