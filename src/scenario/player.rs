// src/scenario/player.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, warn};

use super::model::Action;
use crate::dom::{Fingerprint, HostDocument, MemoryDocument, NodeId};
use crate::engine::EngineEvent;
use crate::errors::{PlayguardError, Result};
use crate::prefs::{PreferenceStore, Preferences};
use crate::types::EntryReason;

/// Applies scenario actions to an in-memory document.
#[derive(Debug)]
pub struct ScenarioPlayer {
    document: MemoryDocument,
    store: Arc<dyn PreferenceStore>,
    events: mpsc::Sender<EngineEvent>,
    names: HashMap<String, NodeId>,
}

impl ScenarioPlayer {
    pub fn new(
        document: MemoryDocument,
        store: Arc<dyn PreferenceStore>,
        events: mpsc::Sender<EngineEvent>,
    ) -> Self {
        Self {
            document,
            store,
            events,
            names: HashMap::new(),
        }
    }

    pub fn document(&self) -> &MemoryDocument {
        &self.document
    }

    /// The node bound to `name` by an earlier insert or recycle.
    pub fn named(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Apply setup actions; any failure aborts the replay.
    pub async fn apply_setup(&mut self, actions: &[Action]) -> Result<()> {
        for action in actions {
            self.apply(action).await?;
        }
        Ok(())
    }

    /// Resolve a target: a bound name, `document`, or a fingerprint.
    pub fn resolve(&self, target: &str) -> Result<NodeId> {
        if let Some(node) = self.named(target) {
            return Ok(node);
        }
        if target == "document" {
            return Ok(self.document.document_root());
        }
        let fp = Fingerprint::parse(target)?;
        self.document
            .query(self.document.document_root(), &fp)
            .ok_or_else(|| PlayguardError::ScenarioError(format!("no node matches '{target}'")))
    }

    pub async fn apply(&mut self, action: &Action) -> Result<()> {
        debug!(action = action.kind(), "applying scenario action");
        match action {
            Action::Insert {
                parent,
                element,
                name,
            } => {
                let parent = self.resolve(parent)?;
                let node = self.document.append(parent, element)?;
                if let Some(name) = name {
                    self.names.insert(name.clone(), node);
                }
            }
            Action::Remove { target } => {
                let node = self.resolve(target)?;
                if !self.document.remove(node) {
                    warn!(target = %target, "remove: node was already detached");
                }
            }
            Action::Recycle { target, name } => {
                let old = self.resolve(target)?;
                let new = self.document.recycle(old)?;
                // A recycled node keeps its role; rebind every name to it.
                for bound in self.names.values_mut().filter(|n| **n == old) {
                    *bound = new;
                }
                if let Some(name) = name {
                    self.names.insert(name.clone(), new);
                }
            }
            Action::Media { target, event } => {
                let node = self.resolve(target)?;
                let listeners = self.document.dispatch_media(node, *event);
                debug!(target = %target, ?event, listeners, "media event dispatched");
            }
            Action::Navigate => {
                self.events
                    .send(EngineEvent::Entered {
                        reason: EntryReason::Navigation,
                    })
                    .await
                    .map_err(|_| anyhow!("engine stopped before navigation"))?;
            }
            Action::SetPreference { fs_on_short_play } => {
                self.store.set(Preferences {
                    fs_on_short_play: fs_on_short_play.is_on(),
                })?;
            }
            Action::ExitFullscreen => self.document.exit_fullscreen(),
            Action::RejectFullscreen { reject } => self.document.set_reject_fullscreen(*reject),
        }
        Ok(())
    }

    /// Replay `timeline` against the wall clock (tokio time), keep the
    /// engine running for `settle`, then request shutdown.
    ///
    /// Failing steps are logged and skipped.
    pub async fn play(mut self, timeline: Vec<(Duration, Action)>, settle: Duration) {
        let start = Instant::now();
        for (i, (at, action)) in timeline.iter().enumerate() {
            sleep_until(start + *at).await;
            if let Err(e) = self.apply(action).await {
                warn!(step = i, action = action.kind(), "scenario step failed: {e}");
            }
        }
        sleep(settle).await;
        info!("scenario finished; requesting shutdown");
        let _ = self.events.send(EngineEvent::ShutdownRequested).await;
    }
}

/// `tag#id.class` rendering of a node for reports.
pub fn describe_node(document: &MemoryDocument, node: NodeId) -> String {
    let Some(data) = document.element(node) else {
        return format!("{node:?}");
    };
    let mut out = data.tag.clone();
    if let Some(id) = &data.id {
        out.push('#');
        out.push_str(id);
    }
    for class in &data.classes {
        out.push('.');
        out.push_str(class);
    }
    out
}
