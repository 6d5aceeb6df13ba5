// src/prefs/live.rs

use std::sync::{Arc, RwLock};

use tracing::info;

use super::{PreferenceStore, Preferences};
use crate::errors::Result;

/// Shared snapshot of the current preferences.
///
/// Readers get a copy; reloads replace the whole value.
#[derive(Debug, Clone, Default)]
pub struct LivePreferences {
    current: Arc<RwLock<Preferences>>,
}

impl LivePreferences {
    pub fn new(initial: Preferences) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn current(&self) -> Preferences {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the snapshot; returns whether the value changed.
    pub fn replace(&self, prefs: Preferences) -> bool {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let changed = *guard != prefs;
        *guard = prefs;
        changed
    }

    /// Load from `store` and replace the snapshot.
    pub fn reload(&self, store: &dyn PreferenceStore, defaults: Preferences) -> Result<Preferences> {
        let prefs = store.get(defaults)?;
        let changed = self.replace(prefs);
        info!(?prefs, changed, "using preferences");
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPreferenceStore;

    #[test]
    fn reload_replaces_snapshot_seen_by_clones() {
        let store = MemoryPreferenceStore::new();
        let live = LivePreferences::new(Preferences::default());
        let reader = live.clone();

        store.set(Preferences { fs_on_short_play: false }).unwrap();
        assert!(reader.current().fs_on_short_play, "not reloaded yet");

        live.reload(&store, Preferences::default()).unwrap();
        assert!(!reader.current().fs_on_short_play);
        assert!(!live.replace(Preferences { fs_on_short_play: false }));
    }
}
