// src/prefs/mod.rs

//! Configuration Store: live user preferences.
//!
//! - [`Preferences`] is the normalised, strongly typed view the guard reads.
//! - [`RawPreferences`] / [`RawFlag`] mirror the external storage format,
//!   where flags are string sentinels (`"true"` / `"false"`) but plain
//!   booleans are accepted too.
//! - [`PreferenceStore`] is the store boundary: `get(defaults)`, `set`, and
//!   a change-notification subscription.
//! - [`LivePreferences`] is the snapshot shared with running guards; it is
//!   replaced wholesale on every change notification.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub mod file;
pub mod live;
pub mod memory;

pub use file::FilePreferenceStore;
pub use live::LivePreferences;
pub use memory::MemoryPreferenceStore;

/// Normalised preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    /// Re-request fullscreen when playback resumes after a short pause.
    pub fs_on_short_play: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            fs_on_short_play: true,
        }
    }
}

/// A flag as found in storage.
///
/// Text values are compared exactly against [`RawFlag::ON`]; anything else
/// (including `"TRUE"` or `"yes"`) reads as off.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawFlag {
    Bool(bool),
    Text(String),
}

impl RawFlag {
    pub const ON: &'static str = "true";
    pub const OFF: &'static str = "false";

    pub fn is_on(&self) -> bool {
        match self {
            RawFlag::Bool(b) => *b,
            RawFlag::Text(s) => s == Self::ON,
        }
    }

    /// The sentinel form written back to storage.
    pub fn sentinel(on: bool) -> Self {
        RawFlag::Text(if on { Self::ON } else { Self::OFF }.to_string())
    }
}

/// Storage-format preferences; missing keys fall back to the defaults
/// passed to [`RawPreferences::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_on_short_play: Option<RawFlag>,
}

impl RawPreferences {
    pub fn resolve(&self, defaults: Preferences) -> Preferences {
        Preferences {
            fs_on_short_play: self
                .fs_on_short_play
                .as_ref()
                .map(RawFlag::is_on)
                .unwrap_or(defaults.fs_on_short_play),
        }
    }

    pub fn from_preferences(prefs: Preferences) -> Self {
        Self {
            fs_on_short_play: Some(RawFlag::sentinel(prefs.fs_on_short_play)),
        }
    }
}

/// Store boundary for user preferences.
pub trait PreferenceStore: Send + Sync + Debug {
    /// Current values, with `defaults` filling any missing key.
    fn get(&self, defaults: Preferences) -> Result<Preferences>;

    /// Persist new values (the options surface's write path) and notify
    /// subscribers.
    fn set(&self, prefs: Preferences) -> Result<()>;

    /// Change notifications. The value is a generation counter; only the
    /// fact that it changed matters.
    fn subscribe(&self) -> tokio::sync::watch::Receiver<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_flags_compare_exactly_against_sentinel() {
        assert!(RawFlag::Text("true".into()).is_on());
        assert!(!RawFlag::Text("false".into()).is_on());
        assert!(!RawFlag::Text("TRUE".into()).is_on());
        assert!(!RawFlag::Text("yes".into()).is_on());
        assert!(RawFlag::Bool(true).is_on());
        assert!(!RawFlag::Bool(false).is_on());
    }

    #[test]
    fn raw_preferences_accept_strings_and_booleans() {
        let raw: RawPreferences = toml::from_str(r#"fs_on_short_play = "false""#).unwrap();
        assert!(!raw.resolve(Preferences::default()).fs_on_short_play);

        let raw: RawPreferences = toml::from_str("fs_on_short_play = true").unwrap();
        let off = Preferences { fs_on_short_play: false };
        assert!(raw.resolve(off).fs_on_short_play);

        let raw: RawPreferences = toml::from_str("").unwrap();
        assert_eq!(raw.resolve(off), off, "missing key takes the default");
    }

    #[test]
    fn written_form_uses_string_sentinels() {
        let raw = RawPreferences::from_preferences(Preferences { fs_on_short_play: false });
        let text = toml::to_string(&raw).unwrap();
        assert_eq!(text.trim(), r#"fs_on_short_play = "false""#);
    }
}
