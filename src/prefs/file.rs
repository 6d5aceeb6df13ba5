// src/prefs/file.rs

//! TOML-file-backed preference store.
//!
//! The file holds the storage format, e.g.
//!
//! ```toml
//! fs_on_short_play = "false"
//! ```
//!
//! With [`FilePreferenceStore::watch`], the file's directory is observed with
//! `notify`; subscribers are signalled only when the file's content hash
//! actually changes, so editor save dances and our own writes echoing back
//! do not cause redundant reloads.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use blake3::Hasher;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{PreferenceStore, Preferences, RawPreferences};
use crate::errors::Result;

/// Content hash of the preferences file; `None` when the file is absent.
fn content_hash(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Some(hasher.finalize().to_hex().to_string())
}

/// Shared between the store and the notify callback.
struct ChangeTracker {
    path: PathBuf,
    last_hash: Mutex<Option<String>>,
    changes: watch::Sender<u64>,
}

impl ChangeTracker {
    /// Re-hash the file and signal subscribers if the content changed.
    fn refresh(&self) -> bool {
        let hash = content_hash(&self.path);
        let mut last = self.last_hash.lock().unwrap_or_else(|e| e.into_inner());
        if *last == hash {
            debug!(path = ?self.path, "preferences file touched but unchanged");
            return false;
        }
        *last = hash;
        drop(last);
        debug!(path = ?self.path, "preferences file changed");
        self.changes.send_modify(|generation| *generation += 1);
        true
    }
}

pub struct FilePreferenceStore {
    tracker: Arc<ChangeTracker>,
    _watcher: Option<RecommendedWatcher>,
}

impl fmt::Debug for FilePreferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePreferenceStore")
            .field("path", &self.tracker.path)
            .field("watching", &self._watcher.is_some())
            .finish()
    }
}

impl FilePreferenceStore {
    /// Open the store without watching the file for external edits.
    ///
    /// A missing file is fine: reads fall back to the defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (changes, _) = watch::channel(0);
        let last_hash = Mutex::new(content_hash(&path));
        Self {
            tracker: Arc::new(ChangeTracker {
                path,
                last_hash,
                changes,
            }),
            _watcher: None,
        }
    }

    /// Open the store and watch its file for external edits.
    pub fn watch(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::open(path);
        let dir = match store.tracker.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = store.tracker.path.file_name().map(|n| n.to_os_string());

        let tracker = Arc::clone(&store.tracker);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if ours {
                        tracker.refresh();
                    }
                }
                Err(err) => {
                    warn!("preferences watch error: {err}");
                }
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(path = ?store.tracker.path, "watching preferences file");

        store._watcher = Some(watcher);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.tracker.path
    }

    /// Re-check the file now; returns whether subscribers were signalled.
    pub fn refresh(&self) -> bool {
        self.tracker.refresh()
    }

    fn read_raw(&self) -> Result<RawPreferences> {
        let path = &self.tracker.path;
        if !path.exists() {
            return Ok(RawPreferences::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading preferences file {:?}", path))?;
        Ok(toml::from_str(&contents)?)
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, defaults: Preferences) -> Result<Preferences> {
        Ok(self.read_raw()?.resolve(defaults))
    }

    fn set(&self, prefs: Preferences) -> Result<()> {
        let path = &self.tracker.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let text = toml::to_string(&RawPreferences::from_preferences(prefs))?;
        fs::write(path, text).with_context(|| format!("writing preferences file {:?}", path))?;
        self.tracker.refresh();
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.tracker.changes.subscribe()
    }
}
