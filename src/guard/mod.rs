// src/guard/mod.rs

//! Guard state machine.
//!
//! One [`GuardRun`] per run id cycles through the [`Phase`]s:
//!
//! 1. `AwaitPlayer`: wait for the player root, request fullscreen at once.
//! 2. `AwaitPlayerView`: wait for the player view, re-query the player
//!    (it may have been recycled) and request fullscreen again.
//! 3. `AttachAndWaitForInterrupt`: attach media listeners to every new
//!    media element, note interruption banners, and leave the phase as soon
//!    as a watched node disconnects.
//!
//! then loops back to 1. Runs end only when their wait is aborted (the run
//! was superseded) or the change source closes.
//!
//! Everything shared between runs (document, watcher, delays, preferences)
//! lives in [`GuardContext`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ConfigFile, DelaySettings, Selectors};
use crate::delay::Delay;
use crate::dom::{Fingerprint, HostDocument, NodeId};
use crate::errors::{PlayguardError, Result};
use crate::prefs::LivePreferences;
use crate::types::RunId;
use crate::watch::{WatchSession, Watcher};

pub mod media;
pub mod run;

pub use media::{ResumeDecision, resume_decision};
pub use run::GuardRun;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitPlayer,
    AwaitPlayerView,
    AttachAndWaitForInterrupt,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AwaitPlayer => "await_player",
            Phase::AwaitPlayerView => "await_player_view",
            Phase::AttachAndWaitForInterrupt => "attach_and_wait_for_interrupt",
        };
        f.write_str(name)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A newer run (or shutdown) took over.
    Superseded,
    /// The host tree stopped delivering change signals.
    SourceClosed,
}

/// The two debounce windows driven by media events.
#[derive(Debug)]
pub struct Delays {
    /// Triggered on seek; while pending, a resume is not a reason to go
    /// fullscreen.
    pub seek: Delay,
    /// Triggered on pause; once passed, a resume always goes fullscreen.
    pub long_pause: Delay,
}

impl Delays {
    pub fn from_settings(settings: &DelaySettings) -> Self {
        Self {
            seek: Delay::new("seek", settings.seek),
            long_pause: Delay::new("long_pause", settings.long_pause),
        }
    }
}

/// Engine-wide state shared by every run and every attached listener.
#[derive(Debug)]
pub struct GuardContext {
    pub document: Arc<dyn HostDocument>,
    pub watcher: Arc<Watcher>,
    pub selectors: Selectors,
    pub delays: Delays,
    pub prefs: LivePreferences,
    pub mount_point: NodeId,
    /// Media fingerprint first, then the interruption banners.
    playback: Vec<Fingerprint>,
}

impl GuardContext {
    /// Locate the mount point and build the shared state.
    ///
    /// Fails with [`PlayguardError::MissingRoot`] if the mount point is not
    /// in the document; the page is then not one this guard can work on.
    pub fn new(
        document: Arc<dyn HostDocument>,
        config: &ConfigFile,
        prefs: LivePreferences,
    ) -> Result<Self> {
        let selectors = config.selectors.clone();
        let mount_point = document
            .query(document.document_root(), &selectors.mount_point)
            .ok_or_else(|| PlayguardError::MissingRoot(selectors.mount_point.to_string()))?;
        debug!(?mount_point, "mount point found");

        let mut playback = Vec::with_capacity(1 + selectors.interruptions.len());
        playback.push(selectors.media.clone());
        playback.extend(selectors.interruptions.iter().cloned());

        Ok(Self {
            watcher: Arc::new(Watcher::new(Arc::clone(&document), config.watch)),
            document,
            selectors,
            delays: Delays::from_settings(&config.delays),
            prefs,
            mount_point,
            playback,
        })
    }

    pub fn playback_fingerprints(&self) -> &[Fingerprint] {
        &self.playback
    }

    /// The player root as it is in the tree right now.
    pub fn live_player(&self) -> Option<NodeId> {
        self.document.query(self.mount_point, &self.selectors.player)
    }

    /// Ask for fullscreen on `node` unless the run is stale or something is
    /// already fullscreen. Fire-and-forget: the host may still refuse.
    pub fn request_fullscreen(
        &self,
        session: &WatchSession,
        run_id: RunId,
        node: NodeId,
        reason: &'static str,
    ) -> bool {
        if !session.is_live() {
            debug!(run_id = %run_id, reason, "run superseded; not requesting fullscreen");
            return false;
        }
        if let Some(current) = self.document.fullscreen_element() {
            debug!(run_id = %run_id, ?current, reason, "already fullscreen");
            return false;
        }
        info!(run_id = %run_id, ?node, reason, "requesting fullscreen");
        self.document.request_fullscreen(node);
        true
    }
}
