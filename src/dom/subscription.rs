// src/dom/subscription.rs

//! Change-notification subscriptions.
//!
//! A [`ChangeSubscription`] delivers a payload-free "re-check now" signal for
//! every structural mutation under the subtree root it was created for. The
//! source side keeps an unbounded sender; the subscription owns the receiver
//! and a [`SubscriptionHandle`] that unregisters the sender.
//!
//! Disposal runs at most once no matter how many clones of the handle call
//! [`SubscriptionHandle::dispose`], and dropping the subscription disposes it.

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::dom::NodeId;

type Disposer = Box<dyn FnOnce() + Send>;

/// Shareable, idempotent disposal capability for one subscription.
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: u64,
    disposer: Arc<Mutex<Option<Disposer>>>,
}

impl SubscriptionHandle {
    fn new(id: u64, disposer: Disposer) -> Self {
        Self {
            id,
            disposer: Arc::new(Mutex::new(Some(disposer))),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unsubscribe from the source. Returns `true` only for the call that
    /// actually performed the disposal.
    pub fn dispose(&self) -> bool {
        let disposer = self
            .disposer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match disposer {
            Some(dispose) => {
                dispose();
                true
            }
            None => false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A live subscription to structural changes under `root`.
pub struct ChangeSubscription {
    root: NodeId,
    rx: mpsc::UnboundedReceiver<()>,
    handle: SubscriptionHandle,
}

impl ChangeSubscription {
    pub fn new(
        id: u64,
        root: NodeId,
        rx: mpsc::UnboundedReceiver<()>,
        disposer: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            root,
            rx,
            handle: SubscriptionHandle::new(id, Box::new(disposer)),
        }
    }

    pub fn id(&self) -> u64 {
        self.handle.id()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// A clone of the disposal capability, e.g. for a cancellation slot.
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Wait for the next change signal.
    ///
    /// Signals that queued up meanwhile are coalesced into one. Returns
    /// `false` once the source side is gone (disposed or torn down).
    pub async fn changed(&mut self) -> bool {
        if self.rx.recv().await.is_none() {
            return false;
        }
        while self.rx.try_recv().is_ok() {}
        true
    }

    pub fn dispose(&self) -> bool {
        self.handle.dispose()
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.handle.dispose();
    }
}

impl fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("root", &self.root)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn dispose_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::unbounded_channel();
        let counter = Arc::clone(&calls);
        let sub = ChangeSubscription::new(1, NodeId(0), rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let handle = sub.handle();
        assert!(handle.dispose());
        assert!(!handle.dispose());
        assert!(!sub.dispose());
        drop(sub);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn queued_signals_are_coalesced() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sub = ChangeSubscription::new(1, NodeId(0), rx, || {});
        tx.send(()).unwrap();
        tx.send(()).unwrap();
        tx.send(()).unwrap();

        assert!(sub.changed().await);
        drop(tx);
        assert!(!sub.changed().await);
    }
}
