//! Immutable cluster membership snapshots.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{DeploymentId, StoreId};
use crate::node::{NodeInfo, NodeRef, Permission};

/// Raised when a [`ClusterView`] is constructed with values that violate its
/// invariants (§3 of the spec). Construction is always validated; there is no
/// way to obtain an invalid `ClusterView`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterViewError {
    #[error("alternate master count {alts} exceeds failover factor {failover_factor}")]
    TooManyAlts { alts: usize, failover_factor: u32 },

    #[error("master {0} must not also appear in the alternate master list")]
    MasterInAlts(NodeRef),

    #[error("alternate master list contains a duplicate entry: {0}")]
    DuplicateAlt(NodeRef),

    #[error("replication factor is zero but {0} alternate master(s) were given")]
    AltsWithoutReplication(usize),
}

/// An immutable snapshot of cluster membership.
///
/// Replaced wholesale on every successful membership-changing request; never
/// mutated in place. See [`ClusterViewError`] for the invariants enforced at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterView {
    pub deployment_id: DeploymentId,
    pub master: NodeRef,
    pub alts: Vec<NodeRef>,
    pub workers: BTreeSet<NodeRef>,
    pub replication_factor: u32,
    pub failover_factor: u32,
    pub store_id: StoreId,
}

impl ClusterView {
    /// Constructs a view, validating the invariants from §3.
    pub fn new(
        deployment_id: DeploymentId,
        master: NodeRef,
        alts: Vec<NodeRef>,
        workers: BTreeSet<NodeRef>,
        replication_factor: u32,
        failover_factor: u32,
        store_id: StoreId,
    ) -> Result<Self, ClusterViewError> {
        if alts.len() > failover_factor as usize {
            return Err(ClusterViewError::TooManyAlts {
                alts: alts.len(),
                failover_factor,
            });
        }
        if alts.contains(&master) {
            return Err(ClusterViewError::MasterInAlts(master));
        }
        let mut seen = BTreeSet::new();
        for alt in &alts {
            if !seen.insert(alt) {
                return Err(ClusterViewError::DuplicateAlt(alt.clone()));
            }
        }
        if replication_factor == 0 && !alts.is_empty() {
            return Err(ClusterViewError::AltsWithoutReplication(alts.len()));
        }

        Ok(Self {
            deployment_id,
            master,
            alts,
            workers,
            replication_factor,
            failover_factor,
            store_id,
        })
    }

    /// An unbooted view: zero deployment id, no workers, no alternates.
    ///
    /// `master` is a placeholder and must not be dispatched to; callers
    /// should check [`Self::is_booted`] before trusting `master`.
    pub fn unbooted(placeholder_master: NodeRef, store_id: StoreId) -> Self {
        Self {
            deployment_id: DeploymentId::UNBOOTED,
            master: placeholder_master,
            alts: Vec::new(),
            workers: BTreeSet::new(),
            replication_factor: 0,
            failover_factor: 0,
            store_id,
        }
    }

    pub fn is_booted(&self) -> bool {
        !self.deployment_id.is_unbooted()
    }

    pub fn has_failover(&self) -> bool {
        !self.alts.is_empty()
    }

    /// Targets in dispatch order: master first, then alternates in declaration order.
    pub fn ordered_targets(&self) -> Vec<NodeRef> {
        let mut targets = Vec::with_capacity(1 + self.alts.len());
        targets.push(self.master.clone());
        targets.extend(self.alts.iter().cloned());
        targets
    }

    /// Filters `candidates` down to those eligible to become master.
    pub fn candidates_for_master<'a>(
        candidates: &'a [NodeInfo],
    ) -> impl Iterator<Item = &'a NodeInfo> {
        candidates
            .iter()
            .filter(|n| n.permissions.contains(&Permission::Master))
    }
}

/// A one-time configuration consumed by `Boot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootConfiguration {
    pub nodes: Vec<NodeRef>,
    pub replication_factor: u32,
    pub failover_factor: u32,
    pub store_id: Option<StoreId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: &str) -> NodeRef {
        NodeRef::new(format!("127.0.0.1:{n}"), n)
    }

    #[test]
    fn rejects_master_in_alts() {
        let master = node("1");
        let err = ClusterView::new(
            DeploymentId::new(),
            master.clone(),
            vec![master.clone()],
            BTreeSet::new(),
            1,
            1,
            StoreId::new("local"),
        )
        .unwrap_err();
        assert_eq!(err, ClusterViewError::MasterInAlts(master));
    }

    #[test]
    fn rejects_too_many_alts() {
        let err = ClusterView::new(
            DeploymentId::new(),
            node("1"),
            vec![node("2"), node("3")],
            BTreeSet::new(),
            2,
            1,
            StoreId::new("local"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ClusterViewError::TooManyAlts {
                alts: 2,
                failover_factor: 1
            }
        );
    }

    #[test]
    fn rejects_duplicate_alts() {
        let err = ClusterView::new(
            DeploymentId::new(),
            node("1"),
            vec![node("2"), node("2")],
            BTreeSet::new(),
            2,
            2,
            StoreId::new("local"),
        )
        .unwrap_err();
        assert_eq!(err, ClusterViewError::DuplicateAlt(node("2")));
    }

    #[test]
    fn rejects_alts_with_zero_replication() {
        let err = ClusterView::new(
            DeploymentId::new(),
            node("1"),
            vec![node("2")],
            BTreeSet::new(),
            0,
            1,
            StoreId::new("local"),
        )
        .unwrap_err();
        assert_eq!(err, ClusterViewError::AltsWithoutReplication(1));
    }

    #[test]
    fn ordered_targets_puts_master_first() {
        let view = ClusterView::new(
            DeploymentId::new(),
            node("1"),
            vec![node("2"), node("3")],
            BTreeSet::new(),
            2,
            2,
            StoreId::new("local"),
        )
        .unwrap();
        assert_eq!(view.ordered_targets(), vec![node("1"), node("2"), node("3")]);
    }

    #[test]
    fn unbooted_view_reports_not_booted() {
        let view = ClusterView::unbooted(node("1"), StoreId::new("local"));
        assert!(!view.is_booted());
        assert!(!view.has_failover());
    }
}
