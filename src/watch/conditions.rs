// src/watch/conditions.rs

//! Fingerprint-level waits built on [`WatchSession::watch`].
//!
//! These add no concurrency semantics of their own: each is a predicate
//! handed to the base watcher.

use crate::dom::{Fingerprint, NodeId};
use crate::watch::{WatchError, WatchSession};

/// What changed first among a set of watched nodes and fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// A node matching `fingerprints[index]` that was not seen before.
    Appeared { index: usize, node: NodeId },
    /// A previously captured node left the document.
    Disconnected { node: NodeId },
}

impl WatchSession {
    /// Wait until an element matching `fingerprint` exists under `root`.
    pub async fn until_element(
        &self,
        root: NodeId,
        fingerprint: &Fingerprint,
    ) -> Result<NodeId, WatchError> {
        self.watch(root, |doc| doc.query(root, fingerprint)).await
    }

    /// Wait until no element matching `fingerprint` exists under `root`.
    pub async fn while_element(
        &self,
        root: NodeId,
        fingerprint: &Fingerprint,
    ) -> Result<(), WatchError> {
        self.watch(root, |doc| doc.query(root, fingerprint).is_none().then_some(()))
            .await
    }

    /// Wait until the specific `node` is disconnected.
    ///
    /// Checks identity, not fingerprint: a recycled replacement matching the
    /// same fingerprint does not keep this wait pending.
    pub async fn until_disconnected(&self, root: NodeId, node: NodeId) -> Result<(), WatchError> {
        self.watch(root, |doc| (!doc.is_connected(node)).then_some(())).await
    }

    /// Wait until any of `fingerprints` matches; returns the index of the
    /// first matching fingerprint (list order) and the node.
    pub async fn until_one_of(
        &self,
        root: NodeId,
        fingerprints: &[Fingerprint],
    ) -> Result<(usize, NodeId), WatchError> {
        self.watch(root, |doc| {
            fingerprints
                .iter()
                .enumerate()
                .find_map(|(index, fp)| doc.query(root, fp).map(|node| (index, node)))
        })
        .await
    }

    /// Wait until either a not-yet-seen node matching one of `fingerprints`
    /// appears inside `scope`, or one of the watched nodes disconnects.
    ///
    /// Signals are taken from `root`'s subtree; `scope` itself and every
    /// node in `seen` are watched for disconnection. Disconnection wins
    /// over appearance when both hold.
    pub async fn until_change_among(
        &self,
        root: NodeId,
        scope: NodeId,
        fingerprints: &[Fingerprint],
        seen: &[NodeId],
    ) -> Result<Observation, WatchError> {
        self.watch(root, |doc| {
            if let Some(node) = std::iter::once(&scope)
                .chain(seen)
                .find(|n| !doc.is_connected(**n))
            {
                return Some(Observation::Disconnected { node: *node });
            }
            fingerprints.iter().enumerate().find_map(|(index, fp)| {
                doc.query_all(scope, fp)
                    .into_iter()
                    .find(|n| !seen.contains(n))
                    .map(|node| Observation::Appeared { index, node })
            })
        })
        .await
    }

    /// Wait until a new element matching `fingerprint` appears under `root`
    /// or the previously captured `captured` node is disconnected.
    pub async fn until_appears_or_disconnected(
        &self,
        root: NodeId,
        fingerprint: &Fingerprint,
        captured: NodeId,
    ) -> Result<Observation, WatchError> {
        self.until_change_among(root, root, std::slice::from_ref(fingerprint), &[captured])
            .await
    }
}
