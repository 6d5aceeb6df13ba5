// src/prefs/memory.rs

use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::debug;

use super::{PreferenceStore, Preferences, RawPreferences};
use crate::errors::Result;

/// Preference store kept in memory (replay driver, tests).
#[derive(Debug)]
pub struct MemoryPreferenceStore {
    values: Mutex<RawPreferences>,
    changes: watch::Sender<u64>,
}

impl Default for MemoryPreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::with_raw(RawPreferences::default())
    }

    pub fn with_raw(raw: RawPreferences) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            values: Mutex::new(raw),
            changes,
        }
    }

    fn values(&self) -> MutexGuard<'_, RawPreferences> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the stored values verbatim, in storage format.
    pub fn set_raw(&self, raw: RawPreferences) {
        debug!(?raw, "preferences written");
        *self.values() = raw;
        self.changes.send_modify(|generation| *generation += 1);
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, defaults: Preferences) -> Result<Preferences> {
        Ok(self.values().resolve(defaults))
    }

    fn set(&self, prefs: Preferences) -> Result<()> {
        self.set_raw(RawPreferences::from_preferences(prefs));
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}
