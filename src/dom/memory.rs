// src/dom/memory.rs

//! In-memory host document.
//!
//! Behaves like the part of a browser DOM the guard relies on:
//! - nodes live in an arena keyed by [`NodeId`]; removed subtrees stay in the
//!   arena but are disconnected,
//! - every child-list mutation signals all subscriptions rooted at the
//!   mutated parent or any of its ancestors,
//! - recycling replaces a node with a structurally identical copy under a
//!   fresh id (listeners are not copied),
//! - removing the fullscreen node (or an ancestor) drops fullscreen.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{
    ChangeSubscription, ElementData, Fingerprint, HostDocument, MediaEvent, MediaListener, NodeId,
};
use crate::errors::Result;

struct Node {
    data: ElementData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<MediaListener>,
}

struct Subscriber {
    root: NodeId,
    tx: mpsc::UnboundedSender<()>,
}

#[derive(Default)]
struct DocumentState {
    nodes: HashMap<NodeId, Node>,
    next_node: u64,
    subscribers: HashMap<u64, Subscriber>,
    next_subscription: u64,
    peak_subscriptions: usize,
    fullscreen: Option<NodeId>,
    fullscreen_requests: Vec<NodeId>,
    reject_fullscreen: bool,
}

impl DocumentState {
    fn alloc(&mut self, data: ElementData, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                data,
                parent,
                children: Vec::new(),
                listeners: Vec::new(),
            },
        );
        id
    }

    fn ancestors_inclusive(&self, node: NodeId) -> HashSet<NodeId> {
        let mut out = HashSet::new();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if !out.insert(id) {
                break;
            }
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }
        out
    }

    fn is_connected(&self, root: NodeId, node: NodeId) -> bool {
        self.nodes.contains_key(&node) && self.ancestors_inclusive(node).contains(&root)
    }

    /// Signal every subscription whose root contains `parent`.
    fn notify(&self, parent: NodeId) {
        let scope = self.ancestors_inclusive(parent);
        for (id, sub) in &self.subscribers {
            if scope.contains(&sub.root) {
                trace!(subscription = id, "delivering change signal");
                let _ = sub.tx.send(());
            }
        }
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(&root) {
            Some(n) => n.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(n) = self.nodes.get(&id) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    fn clone_subtree(&mut self, source: NodeId, parent: Option<NodeId>) -> Option<NodeId> {
        let (data, children) = {
            let node = self.nodes.get(&source)?;
            (node.data.clone(), node.children.clone())
        };
        let copy = self.alloc(data, parent);
        for child in children {
            if let Some(child_copy) = self.clone_subtree(child, Some(copy)) {
                if let Some(n) = self.nodes.get_mut(&copy) {
                    n.children.push(child_copy);
                }
            }
        }
        Some(copy)
    }

    fn drop_fullscreen_if_detached(&mut self, root: NodeId) {
        if let Some(fs) = self.fullscreen {
            if !self.is_connected(root, fs) {
                debug!(node = ?fs, "fullscreen node left the document; fullscreen exited");
                self.fullscreen = None;
            }
        }
    }
}

/// Thread-safe in-memory document; clones share the same tree.
#[derive(Clone)]
pub struct MemoryDocument {
    state: Arc<Mutex<DocumentState>>,
    root: NodeId,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        let mut state = DocumentState::default();
        let root = state.alloc(
            ElementData {
                tag: "#document".to_string(),
                ..ElementData::default()
            },
            None,
        );
        Self {
            state: Arc::new(Mutex::new(state)),
            root,
        }
    }

    fn lock(&self) -> MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a new element described by `spec` (fingerprint notation).
    pub fn append(&self, parent: NodeId, spec: &str) -> Result<NodeId> {
        let fp = Fingerprint::parse(spec)?;
        self.append_data(parent, ElementData::from_fingerprint(&fp))
    }

    pub fn append_data(&self, parent: NodeId, data: ElementData) -> Result<NodeId> {
        let mut state = self.lock();
        if !state.nodes.contains_key(&parent) {
            return Err(anyhow!("cannot append to unknown node {parent:?}").into());
        }
        let id = state.alloc(data, Some(parent));
        if let Some(p) = state.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        debug!(node = ?id, parent = ?parent, "node appended");
        state.notify(parent);
        Ok(id)
    }

    /// Detach `node` (and its subtree) from its parent.
    ///
    /// Returns `false` for the document root or an already detached node.
    pub fn remove(&self, node: NodeId) -> bool {
        let mut state = self.lock();
        let Some(parent) = state.nodes.get(&node).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(p) = state.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = state.nodes.get_mut(&node) {
            n.parent = None;
        }
        debug!(node = ?node, parent = ?parent, "node removed");
        state.drop_fullscreen_if_detached(self.root);
        state.notify(parent);
        true
    }

    /// Replace `node` by a fresh copy of its subtree at the same position.
    ///
    /// The copy has new ids and no listeners; the old subtree is detached.
    pub fn recycle(&self, node: NodeId) -> Result<NodeId> {
        let mut state = self.lock();
        let parent = state
            .nodes
            .get(&node)
            .and_then(|n| n.parent)
            .ok_or_else(|| anyhow!("cannot recycle detached node {node:?}"))?;
        let copy = state
            .clone_subtree(node, Some(parent))
            .ok_or_else(|| anyhow!("cannot recycle unknown node {node:?}"))?;
        if let Some(p) = state.nodes.get_mut(&parent) {
            if let Some(slot) = p.children.iter_mut().find(|c| **c == node) {
                *slot = copy;
            }
        }
        if let Some(n) = state.nodes.get_mut(&node) {
            n.parent = None;
        }
        debug!(old = ?node, new = ?copy, "node recycled");
        state.drop_fullscreen_if_detached(self.root);
        state.notify(parent);
        Ok(copy)
    }

    /// Fire a media event on `node`; returns how many listeners ran.
    ///
    /// Listeners run outside the document lock so they may call back into
    /// the document.
    pub fn dispatch_media(&self, node: NodeId, event: MediaEvent) -> usize {
        let listeners: Vec<MediaListener> = self
            .lock()
            .nodes
            .get(&node)
            .map(|n| n.listeners.clone())
            .unwrap_or_default();
        debug!(node = ?node, ?event, listeners = listeners.len(), "dispatching media event");
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    pub fn element(&self, node: NodeId) -> Option<ElementData> {
        self.lock().nodes.get(&node).map(|n| n.data.clone())
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.lock()
            .nodes
            .get(&node)
            .map(|n| n.listeners.len())
            .unwrap_or(0)
    }

    /// User leaves fullscreen (e.g. presses Escape).
    pub fn exit_fullscreen(&self) {
        self.lock().fullscreen = None;
    }

    /// Make the host ignore fullscreen requests, as it does when the
    /// originating user gesture is too old.
    pub fn set_reject_fullscreen(&self, reject: bool) {
        self.lock().reject_fullscreen = reject;
    }

    /// Every fullscreen request received so far, granted or not.
    pub fn fullscreen_requests(&self) -> Vec<NodeId> {
        self.lock().fullscreen_requests.clone()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Highest number of simultaneously live subscriptions ever observed.
    pub fn peak_subscriptions(&self) -> usize {
        self.lock().peak_subscriptions
    }

    /// Drop every subscriber, as when the page goes away. Pending waits see
    /// their source close.
    pub fn teardown(&self) {
        let dropped = std::mem::take(&mut self.lock().subscribers);
        debug!(subscriptions = dropped.len(), "document torn down");
    }
}

impl HostDocument for MemoryDocument {
    fn document_root(&self) -> NodeId {
        self.root
    }

    fn query(&self, root: NodeId, fingerprint: &Fingerprint) -> Option<NodeId> {
        let state = self.lock();
        state.descendants(root).into_iter().find(|id| {
            state
                .nodes
                .get(id)
                .is_some_and(|n| fingerprint.matches(&n.data))
        })
    }

    fn query_all(&self, root: NodeId, fingerprint: &Fingerprint) -> Vec<NodeId> {
        let state = self.lock();
        state
            .descendants(root)
            .into_iter()
            .filter(|id| {
                state
                    .nodes
                    .get(id)
                    .is_some_and(|n| fingerprint.matches(&n.data))
            })
            .collect()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.lock().is_connected(self.root, node)
    }

    fn subscribe(&self, root: NodeId) -> ChangeSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let id = state.next_subscription;
        state.next_subscription += 1;
        state.subscribers.insert(id, Subscriber { root, tx });
        state.peak_subscriptions = state.peak_subscriptions.max(state.subscribers.len());
        trace!(subscription = id, root = ?root, "subscribed");

        let weak: Weak<Mutex<DocumentState>> = Arc::downgrade(&self.state);
        ChangeSubscription::new(id, root, rx, move || {
            if let Some(state) = weak.upgrade() {
                state
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .subscribers
                    .remove(&id);
                trace!(subscription = id, "unsubscribed");
            }
        })
    }

    fn add_media_listener(&self, node: NodeId, listener: MediaListener) {
        if let Some(n) = self.lock().nodes.get_mut(&node) {
            n.listeners.push(listener);
        }
    }

    fn request_fullscreen(&self, node: NodeId) {
        let mut state = self.lock();
        state.fullscreen_requests.push(node);
        if state.reject_fullscreen {
            debug!(node = ?node, "fullscreen request rejected by host");
            return;
        }
        if state.is_connected(self.root, node) {
            state.fullscreen = Some(node);
        }
    }

    fn fullscreen_element(&self) -> Option<NodeId> {
        self.lock().fullscreen
    }
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryDocument")
            .field("root", &self.root)
            .field("nodes", &state.nodes.len())
            .field("subscriptions", &state.subscribers.len())
            .field("fullscreen", &state.fullscreen)
            .finish()
    }
}
