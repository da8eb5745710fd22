//! A handle to a single submitted cloud process.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use voltra_cluster::{ClusterError, ProxyHandle, RpcReply, RpcRequest};
use voltra_types::{ClientId, ErrorInfo, LogEntry, ProcessId, ProcessRecord, ProcessStatus};

use crate::error::ProcessError;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(200);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A lightweight reference to a process the cluster is tracking.
///
/// Cheap to clone; every method re-reads through the dispatcher rather than
/// caching anything locally, per §4.G.
#[derive(Clone, Debug)]
pub struct ProcessHandle {
    id: ProcessId,
    proxy: ProxyHandle,
    client_id: ClientId,
}

impl ProcessHandle {
    pub(crate) fn new(id: ProcessId, proxy: ProxyHandle, client_id: ClientId) -> Self {
        Self { id, proxy, client_id }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Re-reads the process's current record through the dispatcher.
    pub async fn status(&self) -> Result<ProcessRecord, ProcessError> {
        match self
            .proxy
            .remote(self.client_id, RpcRequest::GetProcess(self.id))
            .await?
        {
            RpcReply::Process(record) => Ok(record),
            other => Err(ProcessError::Cluster(ClusterError::MalformedReply {
                node: self.proxy.last_view().await?.master,
                reason: format!("GetProcess reply was not Process: {other:?}"),
            })),
        }
    }

    /// Polls [`Self::status`] with exponential backoff (200 ms to 2 s)
    /// between 200 ms and 2 s. `timeout` bounds the whole wait; `None` waits
    /// indefinitely. A timeout does not cancel the remote process.
    pub async fn await_result(&self, timeout: Option<Duration>) -> Result<Vec<u8>, ProcessError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut backoff = MIN_POLL_INTERVAL;

        loop {
            let record = self.status().await?;
            match record.status {
                ProcessStatus::Completed => return Ok(record.result.unwrap_or_default()),
                ProcessStatus::Faulted => {
                    let info = record
                        .error
                        .unwrap_or_else(|| ErrorInfo::new("process faulted with no detail"));
                    return Err(ProcessError::Cluster(ClusterError::Remote(info)));
                }
                ProcessStatus::Killed => return Err(ProcessError::ProcessKilled(self.id)),
                ProcessStatus::Pending | ProcessStatus::Running => {}
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(ProcessError::AwaitTimeout(self.id));
                }
            }
            sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_POLL_INTERVAL);
        }
    }

    /// Returns the log entries the cluster has accumulated for this process
    /// since creation.
    pub async fn get_logs(&self) -> Result<Vec<LogEntry>, ProcessError> {
        match self
            .proxy
            .remote(self.client_id, RpcRequest::GetLogDump(Some(self.id)))
            .await?
        {
            RpcReply::Logs(logs) => Ok(logs),
            other => Err(ProcessError::Cluster(ClusterError::MalformedReply {
                node: self.proxy.last_view().await?.master,
                reason: format!("GetLogDump reply was not Logs: {other:?}"),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use voltra_transport::testing::{MockTransport, Scripted};
    use voltra_types::{ClusterView, ComputationImage, DeploymentId, NodeRef, StoreId};

    fn encode(reply: &RpcReply) -> Vec<u8> {
        postcard::to_allocvec(reply).unwrap()
    }

    fn spawn_proxy(transport: MockTransport, master: NodeRef) -> ProxyHandle {
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

    fn record(id: ProcessId, status: ProcessStatus) -> ProcessRecord {
        ProcessRecord {
            id,
            image: ComputationImage {
                client_id: ClientId::new(),
                name: "n".into(),
                payload: vec![],
                return_type_tag: "unit".into(),
                dependencies: vec![],
            },
            status,
            result: if status == ProcessStatus::Completed {
                Some(vec![1, 2, 3])
            } else {
                None
            },
            error: None,
            created_at: chrono::Utc::now(),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn await_result_returns_immediately_once_completed() {
        let transport = MockTransport::new();
        let master = NodeRef::new("127.0.0.1:1", "1");
        let id = ProcessId::new();
        transport
            .script(
                master.clone(),
                Scripted::Reply(encode(&RpcReply::Process(record(id, ProcessStatus::Completed)))),
            )
            .await;
        let proxy = spawn_proxy(transport, master);
        let handle = ProcessHandle::new(id, proxy, ClientId::new());

        let result = handle.await_result(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn await_result_surfaces_kill() {
        let transport = MockTransport::new();
        let master = NodeRef::new("127.0.0.1:1", "1");
        let id = ProcessId::new();
        transport
            .script(
                master.clone(),
                Scripted::Reply(encode(&RpcReply::Process(record(id, ProcessStatus::Killed)))),
            )
            .await;
        let proxy = spawn_proxy(transport, master);
        let handle = ProcessHandle::new(id, proxy, ClientId::new());

        let err = handle.await_result(None).await.unwrap_err();
        assert!(matches!(err, ProcessError::ProcessKilled(_)));
    }

    #[tokio::test]
    async fn await_result_times_out_while_pending() {
        let transport = MockTransport::new();
        let master = NodeRef::new("127.0.0.1:1", "1");
        let id = ProcessId::new();
        for _ in 0..10 {
            transport
                .script(
                    master.clone(),
                    Scripted::Reply(encode(&RpcReply::Process(record(id, ProcessStatus::Pending)))),
                )
                .await;
        }
        let proxy = spawn_proxy(transport, master);
        let handle = ProcessHandle::new(id, proxy, ClientId::new());

        let err = handle
            .await_result(Some(Duration::from_millis(250)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::AwaitTimeout(_)));
    }
}
