//! The single-writer actor that owns the controller's [`ClusterView`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use voltra_types::{BootConfiguration, ClientId, ClusterView, DeploymentId, NodeInfo, NodeRef};

use crate::dispatcher::FailoverDispatcher;
use crate::error::ClusterError;
use crate::message::{RequestEnvelope, RpcReply, RpcRequest};

/// One item of the proxy's mailbox.
enum Message {
    Remote {
        envelope: RequestEnvelope,
        reply_to: oneshot::Sender<Result<RpcReply, ClusterError>>,
    },
    GetLastView {
        reply_to: oneshot::Sender<ClusterView>,
    },
    /// Replaces the view directly, bypassing dispatch. Used by the lifecycle
    /// controller after `Shutdown` completes, where the post-state is known
    /// locally (`deploymentId` zeroed) rather than read off a reply.
    SetView {
        view: ClusterView,
        reply_to: oneshot::Sender<()>,
    },
    /// §4.D's special-cased boot path: validate candidates, dispatch, then
    /// query the newly elected master directly (bypassing the stale,
    /// pre-boot view) for canonical membership before installing a view.
    MasterBoot {
        client_id: ClientId,
        cfg: BootConfiguration,
        candidates: Vec<NodeInfo>,
        reply_to: oneshot::Sender<Result<(NodeRef, Vec<NodeRef>), ClusterError>>,
    },
    Terminate,
}

/// A cheaply-cloneable handle to a running [`RuntimeProxy`] task.
///
/// Every clone shares the same mailbox; dropping the last handle does not by
/// itself stop the task; call [`Self::terminate`] explicitly.
#[derive(Clone, Debug)]
pub struct ProxyHandle {
    sender: mpsc::UnboundedSender<Message>,
}

impl ProxyHandle {
    /// Dispatches `request` through the current view, applying failover.
    ///
    /// Per §4.D, this is a local commit point: whatever view update the
    /// dispatch produces is installed before the proxy accepts its next
    /// mailbox item, so a caller that issues two requests in sequence on the
    /// same handle is guaranteed the second sees the first's update.
    pub async fn remote(
        &self,
        client_id: ClientId,
        request: RpcRequest,
    ) -> Result<RpcReply, ClusterError> {
        let (reply_to, rx) = oneshot::channel();
        let envelope = RequestEnvelope::new(client_id, request);
        self.sender
            .send(Message::Remote { envelope, reply_to })
            .map_err(|_| ClusterError::ProxyTerminated)?;
        rx.await.map_err(|_| ClusterError::ProxyTerminated)?
    }

    pub async fn last_view(&self) -> Result<ClusterView, ClusterError> {
        let (reply_to, rx) = oneshot::channel();
        self.sender
            .send(Message::GetLastView { reply_to })
            .map_err(|_| ClusterError::ProxyTerminated)?;
        rx.await.map_err(|_| ClusterError::ProxyTerminated)
    }

    /// Replaces the proxy's view wholesale. Used after lifecycle operations
    /// (`MasterBoot`, `Shutdown`) whose effect on membership is determined by
    /// a follow-up query rather than the original reply payload.
    pub async fn set_view(&self, view: ClusterView) -> Result<(), ClusterError> {
        let (reply_to, rx) = oneshot::channel();
        self.sender
            .send(Message::SetView { view, reply_to })
            .map_err(|_| ClusterError::ProxyTerminated)?;
        rx.await.map_err(|_| ClusterError::ProxyTerminated)
    }

    /// Runs the special `MasterBoot` sequence: reject up front if no
    /// candidate is eligible, dispatch with failover, then on success query
    /// the new master directly for canonical membership and install it.
    pub async fn master_boot(
        &self,
        client_id: ClientId,
        cfg: BootConfiguration,
        candidates: Vec<NodeInfo>,
    ) -> Result<(NodeRef, Vec<NodeRef>), ClusterError> {
        let (reply_to, rx) = oneshot::channel();
        self.sender
            .send(Message::MasterBoot {
                client_id,
                cfg,
                candidates,
                reply_to,
            })
            .map_err(|_| ClusterError::ProxyTerminated)?;
        rx.await.map_err(|_| ClusterError::ProxyTerminated)?
    }

    /// Drains the mailbox with `ProxyTerminated` replies and stops the task.
    pub fn terminate(&self) {
        let _ = self.sender.send(Message::Terminate);
    }
}

/// Spawns the proxy task and returns a handle to it.
///
/// `transport` backs the [`FailoverDispatcher`] the proxy drives internally;
/// `per_attempt_timeout`/`probe_timeout` come from [`voltra_config`]'s
/// resolved `Settings` in the facade crate.
pub fn spawn(
    initial_view: ClusterView,
    transport: Arc<dyn voltra_transport::Transport>,
    client_id: ClientId,
    per_attempt_timeout: Duration,
    probe_timeout: Duration,
) -> ProxyHandle {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Message>();
    let dispatcher = FailoverDispatcher::new(transport, client_id, per_attempt_timeout, probe_timeout);

    tokio::task::spawn(async move {
        let mut view = initial_view;
        while let Some(message) = receiver.recv().await {
            match message {
                Message::GetLastView { reply_to } => {
                    let _ = reply_to.send(view.clone());
                }
                Message::SetView { view: new_view, reply_to } => {
                    view = new_view;
                    let _ = reply_to.send(());
                }
                Message::Remote { envelope, reply_to } => {
                    let outcome = dispatcher.dispatch(&view, &envelope).await;
                    if let Some(new_view) = outcome.new_view {
                        info!(deployment_id = %new_view.deployment_id, "runtime proxy installed new view");
                        view = new_view;
                    }
                    if reply_to.send(outcome.reply).is_err() {
                        warn!("runtime proxy caller dropped before reply was delivered");
                    }
                }
                Message::MasterBoot {
                    client_id,
                    cfg,
                    candidates,
                    reply_to,
                } => {
                    let result =
                        run_master_boot(&dispatcher, &mut view, client_id, cfg, &candidates).await;
                    let _ = reply_to.send(result);
                }
                Message::Terminate => {
                    receiver.close();
                    while let Ok(pending) = receiver.try_recv() {
                        match pending {
                            Message::Remote { reply_to, .. } => {
                                let _ = reply_to.send(Err(ClusterError::ProxyTerminated));
                            }
                            Message::MasterBoot { reply_to, .. } => {
                                let _ = reply_to.send(Err(ClusterError::ProxyTerminated));
                            }
                            Message::GetLastView { .. } | Message::SetView { .. } => {}
                            Message::Terminate => {}
                        }
                    }
                    break;
                }
            }
        }
    });

    ProxyHandle { sender }
}

async fn run_master_boot(
    dispatcher: &FailoverDispatcher,
    view: &mut ClusterView,
    client_id: ClientId,
    cfg: BootConfiguration,
    candidates: &[NodeInfo],
) -> Result<(NodeRef, Vec<NodeRef>), ClusterError> {
    if ClusterView::candidates_for_master(candidates).next().is_none() {
        return Err(ClusterError::NoEligibleMaster);
    }

    let envelope = RequestEnvelope::new(client_id, RpcRequest::MasterBoot(cfg.clone()));
    let outcome = dispatcher.dispatch(view, &envelope).await;
    if let Some(new_view) = outcome.new_view {
        *view = new_view;
    }
    let (master, alts) = match outcome.reply? {
        RpcReply::MasterBooted { master, alts } => (master, alts),
        other => {
            return Err(ClusterError::MalformedReply {
                node: view.master.clone(),
                reason: format!("MasterBoot reply was not MasterBooted: {other:?}"),
            })
        }
    };

    // Query the newly elected master directly: the pre-boot view still
    // points at whatever candidate the caller picked as the dispatch
    // target, not necessarily the elected master, so this cannot go through
    // the ordinary view-routed dispatch.
    let membership_query = RequestEnvelope::new(client_id, RpcRequest::GetAllNodes);
    let workers = match voltra_transport::request::<RequestEnvelope, RpcReply>(
        dispatcher.transport().as_ref(),
        &master,
        &membership_query,
        dispatcher.per_attempt_timeout(),
    )
    .await
    {
        Ok(RpcReply::Nodes(nodes)) => nodes
            .into_iter()
            .filter(|n| *n != master && !alts.contains(n))
            .collect(),
        _ => std::collections::BTreeSet::new(),
    };

    let new_view = ClusterView::new(
        DeploymentId::new(),
        master.clone(),
        alts.clone(),
        workers,
        cfg.replication_factor,
        cfg.failover_factor,
        cfg.store_id.unwrap_or_else(|| view.store_id.clone()),
    )?;
    info!(deployment_id = %new_view.deployment_id, master = %master, "cluster booted");
    *view = new_view;

    Ok((master, alts))
}
