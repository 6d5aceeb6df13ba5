// src/watch/watcher.rs

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::dom::{HostDocument, NodeId, SubscriptionHandle};
use crate::watch::WatchError;

/// Tunables for the condition watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Evaluate the predicate once right after subscribing instead of
    /// waiting for the first change signal. Lowers latency when the
    /// condition already holds; never changes which value is produced.
    pub eager_check: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self { eager_check: true }
    }
}

/// The single outstanding watch of a [`Watcher`].
///
/// - `cancel` fails the pending wait with [`WatchError::Aborted`].
/// - `subscription` lets the canceller unsubscribe synchronously, so the
///   next watch never overlaps with the old subscription.
struct PendingWatch {
    id: u64,
    cancel: oneshot::Sender<()>,
    subscription: SubscriptionHandle,
}

impl PendingWatch {
    fn abort(self) {
        // Signal before disposing: the waiter must see the abort rather
        // than a closed source.
        let _ = self.cancel.send(());
        self.subscription.dispose();
    }
}

#[derive(Default)]
struct Slot {
    epoch: u64,
    pending: Option<PendingWatch>,
}

/// Single-flight condition watcher over a host document.
///
/// One instance per engine. Starting a watch always cancels the pending one
/// first; cancellation is idempotent.
pub struct Watcher {
    document: Arc<dyn HostDocument>,
    options: WatchOptions,
    slot: Mutex<Slot>,
    next_id: AtomicU64,
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot();
        f.debug_struct("Watcher")
            .field("options", &self.options)
            .field("epoch", &slot.epoch)
            .field("pending", &slot.pending.as_ref().map(|p| p.id))
            .finish_non_exhaustive()
    }
}

impl Watcher {
    pub fn new(document: Arc<dyn HostDocument>, options: WatchOptions) -> Self {
        Self {
            document,
            options,
            slot: Mutex::new(Slot::default()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn document(&self) -> &Arc<dyn HostDocument> {
        &self.document
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn has_pending(&self) -> bool {
        self.slot().pending.is_some()
    }

    pub fn epoch(&self) -> u64 {
        self.slot().epoch
    }

    /// A session bound to the current epoch.
    pub fn session(self: &Arc<Self>) -> WatchSession {
        WatchSession {
            epoch: self.epoch(),
            watcher: Arc::clone(self),
        }
    }

    /// Cancel the pending watch, if any.
    ///
    /// Returns `true` if a watch was actually cancelled; calling it again (or
    /// after the watch resolved) is a no-op.
    pub fn cancel(&self) -> bool {
        let pending = self.slot().pending.take();
        match pending {
            Some(p) => {
                debug!(watch_id = p.id, "cancelling pending watch");
                p.abort();
                true
            }
            None => false,
        }
    }

    /// Invalidate every existing session and cancel the pending watch.
    ///
    /// Sessions created before this call can no longer install watches.
    /// Returns the new epoch.
    pub fn supersede(&self) -> u64 {
        let (epoch, pending) = {
            let mut slot = self.slot();
            slot.epoch += 1;
            (slot.epoch, slot.pending.take())
        };
        if let Some(p) = pending {
            debug!(watch_id = p.id, epoch, "superseding pending watch");
            p.abort();
        }
        epoch
    }

    /// Wait until `predicate` yields a value for the tree under `root`.
    pub async fn watch<T, F>(&self, root: NodeId, predicate: F) -> Result<T, WatchError>
    where
        F: FnMut(&dyn HostDocument) -> Option<T>,
    {
        let epoch = self.epoch();
        self.watch_in(epoch, root, predicate).await
    }

    async fn watch_in<T, F>(
        &self,
        epoch: u64,
        root: NodeId,
        mut predicate: F,
    ) -> Result<T, WatchError>
    where
        F: FnMut(&dyn HostDocument) -> Option<T>,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (cancel_tx, mut cancel_rx) = oneshot::channel();

        let mut subscription = {
            let mut slot = self.slot();
            if slot.epoch != epoch {
                debug!(watch_id = id, epoch, current = slot.epoch, "watch requested by a superseded session");
                return Err(WatchError::Aborted);
            }
            if let Some(previous) = slot.pending.take() {
                warn!(
                    watch_id = id,
                    previous = previous.id,
                    "concurrent watch requested; cancelling the pending one first"
                );
                previous.abort();
            }
            let subscription = self.document.subscribe(root);
            slot.pending = Some(PendingWatch {
                id,
                cancel: cancel_tx,
                subscription: subscription.handle(),
            });
            subscription
        };
        let _release = ReleaseSlot { watcher: self, id };
        debug!(watch_id = id, ?root, subscription = subscription.id(), "watch installed");

        if self.options.eager_check {
            if let Some(value) = predicate(self.document.as_ref()) {
                debug!(watch_id = id, "condition already held");
                return Ok(value);
            }
        }

        loop {
            tokio::select! {
                biased;

                _ = &mut cancel_rx => {
                    debug!(watch_id = id, "watch aborted");
                    return Err(WatchError::Aborted);
                }

                changed = subscription.changed() => {
                    if !changed {
                        if cancel_rx.try_recv().is_ok() {
                            debug!(watch_id = id, "watch aborted");
                            return Err(WatchError::Aborted);
                        }
                        warn!(watch_id = id, "change source closed while waiting");
                        return Err(WatchError::SourceClosed);
                    }
                    if let Some(value) = predicate(self.document.as_ref()) {
                        debug!(watch_id = id, "condition matched");
                        return Ok(value);
                    }
                }
            }
        }
    }
}

/// Clears the slot on every exit path of a watch (match, abort, or the
/// future being dropped), unless a newer watch already took it.
struct ReleaseSlot<'a> {
    watcher: &'a Watcher,
    id: u64,
}

impl Drop for ReleaseSlot<'_> {
    fn drop(&mut self) {
        let mut slot = self.watcher.slot();
        if slot.pending.as_ref().is_some_and(|p| p.id == self.id) {
            slot.pending = None;
        }
    }
}

/// A run's view of the watcher.
///
/// All waits of one guard run go through its session. After
/// [`Watcher::supersede`], [`WatchSession::is_live`] turns false and every
/// wait, pending or future, ends with [`WatchError::Aborted`].
#[derive(Debug, Clone)]
pub struct WatchSession {
    watcher: Arc<Watcher>,
    epoch: u64,
}

impl WatchSession {
    pub fn is_live(&self) -> bool {
        self.watcher.epoch() == self.epoch
    }

    pub fn document(&self) -> &Arc<dyn HostDocument> {
        self.watcher.document()
    }

    pub async fn watch<T, F>(&self, root: NodeId, predicate: F) -> Result<T, WatchError>
    where
        F: FnMut(&dyn HostDocument) -> Option<T>,
    {
        self.watcher.watch_in(self.epoch, root, predicate).await
    }
}
