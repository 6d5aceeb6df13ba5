#![allow(dead_code)]

use std::sync::Arc;

use playguard::config::{ConfigFile, RawConfigFile};
use playguard::dom::{HostDocument, MemoryDocument, NodeId};
use playguard::guard::{GuardContext, GuardRun, RunOutcome};
use playguard::prefs::{LivePreferences, Preferences, RawFlag};
use playguard::types::RunId;
use tokio::task::JoinHandle;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_delays(mut self, seek: &str, long_pause: &str) -> Self {
        self.config.delays.seek = seek.to_string();
        self.config.delays.long_pause = long_pause.to_string();
        self
    }

    pub fn with_eager_check(mut self, eager: bool) -> Self {
        self.config.watch.eager_check = eager;
        self
    }

    /// Default for the short-resume flag, in storage notation.
    pub fn with_fs_on_short_play(mut self, value: &str) -> Self {
        self.config.preferences.fs_on_short_play = RawFlag::Text(value.to_string());
        self
    }

    pub fn with_interruptions(mut self, fingerprints: &[&str]) -> Self {
        self.config.selectors.interruptions = fingerprints.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-memory page with the default fingerprints' structure:
///
/// ```text
/// #document
/// └── div#appMountPoint
///     └── div.watch-video                      (insert_player)
///         ├── div.watch-video--player-view     (insert_view)
///         │   └── video                        (insert_video)
///         └── div.watch-video--playback-restart (insert_banner)
/// ```
#[derive(Debug, Clone)]
pub struct PlayerPage {
    pub doc: MemoryDocument,
    pub mount: NodeId,
}

impl PlayerPage {
    pub fn new() -> Self {
        let doc = MemoryDocument::new();
        let mount = doc
            .append(doc.document_root(), "div#appMountPoint")
            .expect("mount point");
        Self { doc, mount }
    }

    pub fn insert_player(&self) -> NodeId {
        self.doc.append(self.mount, "div.watch-video").expect("player")
    }

    pub fn insert_view(&self, player: NodeId) -> NodeId {
        self.doc
            .append(player, "div.watch-video--player-view")
            .expect("player view")
    }

    pub fn insert_video(&self, parent: NodeId) -> NodeId {
        self.doc.append(parent, "video").expect("video")
    }

    pub fn insert_banner(&self, parent: NodeId) -> NodeId {
        self.doc
            .append(parent, "div.watch-video--playback-restart")
            .expect("banner")
    }

    /// Player, view and video in one go; returns `(player, view, video)`.
    pub fn insert_full_player(&self) -> (NodeId, NodeId, NodeId) {
        let player = self.insert_player();
        let view = self.insert_view(player);
        let video = self.insert_video(view);
        (player, view, video)
    }

    pub fn host(&self) -> Arc<dyn HostDocument> {
        Arc::new(self.doc.clone())
    }

    pub fn guard(&self, config: &ConfigFile, prefs: Preferences) -> Arc<GuardContext> {
        let ctx = GuardContext::new(self.host(), config, LivePreferences::new(prefs))
            .expect("guard context");
        Arc::new(ctx)
    }
}

impl Default for PlayerPage {
    fn default() -> Self {
        Self::new()
    }
}

/// Supersede whatever runs on `ctx` and spawn run `id`, the way the engine
/// does for a re-entry.
pub fn start_run(ctx: &Arc<GuardContext>, id: u64) -> JoinHandle<RunOutcome> {
    ctx.watcher.supersede();
    let run = GuardRun::new(RunId(id), Arc::clone(ctx));
    tokio::spawn(run.run())
}
