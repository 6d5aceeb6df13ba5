// src/dom/mod.rs

//! Host document boundary.
//!
//! The guard never owns the tree it watches. Everything it needs from the
//! host is expressed by [`HostDocument`]:
//! - fingerprint queries scoped to a subtree,
//! - connectivity checks for previously captured nodes,
//! - subtree-wide change subscriptions ([`ChangeSubscription`]),
//! - media listener attachment,
//! - the fullscreen capability.
//!
//! [`memory::MemoryDocument`] is the in-process implementation used by the
//! replay driver and the tests.

use std::fmt::Debug;
use std::sync::Arc;

pub mod fingerprint;
pub mod memory;
pub mod subscription;

pub use fingerprint::{ElementData, Fingerprint};
pub use memory::MemoryDocument;
pub use subscription::{ChangeSubscription, SubscriptionHandle};

pub use crate::types::MediaEvent;

/// Identity of one node instance.
///
/// A recycled node gets a fresh id even when it plays the same role, so
/// comparing ids tells whether a held reference is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Reaction bound to one media node instance.
pub type MediaListener = Arc<dyn Fn(MediaEvent) + Send + Sync>;

/// Abstract host tree interface.
pub trait HostDocument: Send + Sync + Debug {
    /// The top of the tree (the document node).
    fn document_root(&self) -> NodeId;

    /// First descendant of `root` (in document order) matching `fingerprint`.
    /// `root` itself is never returned.
    fn query(&self, root: NodeId, fingerprint: &Fingerprint) -> Option<NodeId>;

    /// All descendants of `root` matching `fingerprint`, in document order.
    fn query_all(&self, root: NodeId, fingerprint: &Fingerprint) -> Vec<NodeId>;

    /// Whether `node` is still attached to the document.
    fn is_connected(&self, node: NodeId) -> bool;

    /// Subscribe to additions/removals anywhere under `root`.
    fn subscribe(&self, root: NodeId) -> ChangeSubscription;

    /// Attach a listener to a media node. Attachments belong to the node
    /// instance and do not carry over when the node is recycled.
    fn add_media_listener(&self, node: NodeId, listener: MediaListener);

    /// Ask the host to make `node` fullscreen. The host may ignore the
    /// request; success is only observable via [`Self::fullscreen_element`].
    fn request_fullscreen(&self, node: NodeId);

    /// The node currently shown fullscreen, if any.
    fn fullscreen_element(&self) -> Option<NodeId>;
}
