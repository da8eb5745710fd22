//! Master-first dispatch with failover across alternate masters.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use voltra_transport::{Transport, TransportError};
use voltra_types::{ClientId, ClusterView, NodeRef};

use crate::error::ClusterError;
use crate::message::{RequestEnvelope, RpcReply, RpcRequest};

/// Dispatches a single request against a [`ClusterView`], retrying across
/// alternates on communication failure and re-probing membership once if
/// every declared target is unreachable.
///
/// See §4.C: remote application errors are never retried, only
/// `CommunicationError`/`Timeout` move on to the next target.
pub struct FailoverDispatcher {
    transport: Arc<dyn Transport>,
    client_id: ClientId,
    per_attempt_timeout: Duration,
    probe_timeout: Duration,
}

/// The outcome of one dispatch, including any membership update the caller
/// must fold back into its view before processing its next message.
pub struct DispatchOutcome {
    pub reply: Result<RpcReply, ClusterError>,
    pub new_view: Option<ClusterView>,
}

enum Attempt {
    Success(RpcReply),
    Remote(voltra_types::ErrorInfo),
    Fatal(ClusterError),
    AllFailed,
}

impl FailoverDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        client_id: ClientId,
        per_attempt_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            client_id,
            per_attempt_timeout,
            probe_timeout,
        }
    }

    /// The underlying transport, for callers (the runtime proxy's `MasterBoot`
    /// handling) that need to address a node directly rather than through a
    /// [`ClusterView`].
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn per_attempt_timeout(&self) -> Duration {
        self.per_attempt_timeout
    }

    pub async fn dispatch(&self, view: &ClusterView, envelope: &RequestEnvelope) -> DispatchOutcome {
        let targets = view.ordered_targets();
        if targets.is_empty() {
            return DispatchOutcome {
                reply: Err(ClusterError::NoMaster),
                new_view: None,
            };
        }

        match self.try_targets(&targets, envelope).await {
            Attempt::Success(reply) => DispatchOutcome {
                reply: Ok(reply),
                new_view: None,
            },
            Attempt::Remote(info) => DispatchOutcome {
                reply: Err(ClusterError::Remote(info)),
                new_view: None,
            },
            Attempt::Fatal(err) => DispatchOutcome {
                reply: Err(err),
                new_view: None,
            },
            Attempt::AllFailed => self.reprobe_and_retry(view, envelope).await,
        }
    }

    async fn reprobe_and_retry(
        &self,
        view: &ClusterView,
        envelope: &RequestEnvelope,
    ) -> DispatchOutcome {
        match self.probe_membership(view).await {
            Some(new_view) => {
                info!(deployment_id = %new_view.deployment_id, master = %new_view.master, "adopted membership from probe, retrying dispatch");
                let retry_targets = new_view.ordered_targets();
                let reply = match self.try_targets(&retry_targets, envelope).await {
                    Attempt::Success(reply) => Ok(reply),
                    Attempt::Remote(info) => Err(ClusterError::Remote(info)),
                    Attempt::Fatal(err) => Err(err),
                    Attempt::AllFailed => {
                        error!("cluster unreachable after membership probe and retry");
                        Err(ClusterError::ClusterUnreachable)
                    }
                };
                DispatchOutcome {
                    reply,
                    new_view: Some(new_view),
                }
            }
            None => {
                error!("cluster unreachable: membership probe failed against every target");
                DispatchOutcome {
                    reply: Err(ClusterError::ClusterUnreachable),
                    new_view: None,
                }
            }
        }
    }

    async fn try_targets(&self, targets: &[NodeRef], envelope: &RequestEnvelope) -> Attempt {
        for target in targets {
            let result = voltra_transport::request::<RequestEnvelope, RpcReply>(
                self.transport.as_ref(),
                target,
                envelope,
                self.per_attempt_timeout,
            )
            .await;
            match result {
                Ok(RpcReply::Error(info)) => return Attempt::Remote(info),
                Ok(reply) => return Attempt::Success(reply),
                Err(TransportError::Remote(info)) => return Attempt::Remote(info),
                Err(TransportError::Codec(e)) => {
                    return Attempt::Fatal(ClusterError::MalformedReply {
                        node: target.clone(),
                        reason: e.to_string(),
                    })
                }
                Err(err @ (TransportError::Communication(_) | TransportError::Timeout)) => {
                    warn!(node = %target, error = %err, "dispatch attempt failed, trying next target");
                }
            }
        }
        Attempt::AllFailed
    }

    /// Probes every target in parallel for its view of membership; the first
    /// successful reply wins and later ones are discarded.
    async fn probe_membership(&self, view: &ClusterView) -> Option<ClusterView> {
        let targets = view.ordered_targets();
        let mut probes = tokio::task::JoinSet::new();
        for target in targets {
            let transport = Arc::clone(&self.transport);
            let timeout = self.probe_timeout;
            let envelope = RequestEnvelope::new(self.client_id, RpcRequest::GetAllNodes);
            probes.spawn(async move {
                voltra_transport::request::<RequestEnvelope, RpcReply>(
                    transport.as_ref(),
                    &target,
                    &envelope,
                    timeout,
                )
                .await
            });
        }

        while let Some(joined) = probes.join_next().await {
            if let Ok(Ok(RpcReply::Nodes(nodes))) = joined {
                probes.abort_all();
                return Some(rebuild_view_from_probe(view, nodes));
            }
        }
        None
    }
}

/// Reinterprets a flat `GetAllNodes` reply as a new view, preserving the
/// replication/failover factors and store id of the prior view and treating
/// the first returned node as the new master.
///
/// This is a deliberate simplification: the wire reply only carries a node
/// list, not role assignments, so the dispatcher cannot recover more
/// structure than "the cluster considers this node first" from it.
fn rebuild_view_from_probe(prior: &ClusterView, mut nodes: Vec<NodeRef>) -> ClusterView {
    if nodes.is_empty() {
        return prior.clone();
    }
    let master = nodes.remove(0);
    let alts: Vec<NodeRef> = nodes
        .iter()
        .take(prior.failover_factor as usize)
        .cloned()
        .collect();
    let workers = nodes.into_iter().skip(alts.len()).collect();

    ClusterView::new(
        prior.deployment_id,
        master,
        alts,
        workers,
        prior.replication_factor,
        prior.failover_factor,
        prior.store_id.clone(),
    )
    .unwrap_or_else(|_| prior.clone())
}
