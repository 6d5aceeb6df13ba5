// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::dom::Fingerprint;
use crate::prefs::{Preferences, RawFlag};
use crate::watch::WatchOptions;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [selectors]
/// mount_point = "div#appMountPoint"
/// player = "div.watch-video"
/// player_view = "div.watch-video--player-view"
/// media = "video"
/// interruptions = [
///     'button[data-uia="player-blocked-play"]',
///     "div.watch-video--playback-restart",
/// ]
///
/// [delays]
/// seek = "1s"
/// long_pause = "5m"
///
/// [watch]
/// eager_check = true
///
/// [preferences]
/// path = "prefs.toml"
/// fs_on_short_play = "true"
/// ```
///
/// All sections are optional and have defaults matching the player this
/// tool was written for.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub selectors: SelectorSection,

    #[serde(default)]
    pub delays: DelaySection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub preferences: PreferenceSection,
}

/// `[selectors]` section: fingerprints of the nodes the guard waits for.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorSection {
    /// Application mount point; must exist at startup.
    #[serde(default = "default_mount_point")]
    pub mount_point: String,

    /// Player root; the node fullscreen is requested on.
    #[serde(default = "default_player")]
    pub player: String,

    /// Inner player view that appears once the player is usable.
    #[serde(default = "default_player_view")]
    pub player_view: String,

    /// The playable media element.
    #[serde(default = "default_media")]
    pub media: String,

    /// Banners that interrupt playback (autoplay blocked, long-pause restart).
    #[serde(default = "default_interruptions")]
    pub interruptions: Vec<String>,
}

fn default_mount_point() -> String {
    "div#appMountPoint".to_string()
}

fn default_player() -> String {
    "div.watch-video".to_string()
}

fn default_player_view() -> String {
    "div.watch-video--player-view".to_string()
}

fn default_media() -> String {
    "video".to_string()
}

fn default_interruptions() -> Vec<String> {
    vec![
        r#"button[data-uia="player-blocked-play"]"#.to_string(),
        "div.watch-video--playback-restart".to_string(),
    ]
}

impl Default for SelectorSection {
    fn default() -> Self {
        Self {
            mount_point: default_mount_point(),
            player: default_player(),
            player_view: default_player_view(),
            media: default_media(),
            interruptions: default_interruptions(),
        }
    }
}

/// `[delays]` section, as duration strings (`ms`, `s`, `m`, `h`).
#[derive(Debug, Clone, Deserialize)]
pub struct DelaySection {
    /// Window after a seek during which a resume does not re-request
    /// fullscreen.
    #[serde(default = "default_seek")]
    pub seek: String,

    /// Pause length after which a resume always re-requests fullscreen.
    #[serde(default = "default_long_pause")]
    pub long_pause: String,
}

fn default_seek() -> String {
    "1s".to_string()
}

fn default_long_pause() -> String {
    "5m".to_string()
}

impl Default for DelaySection {
    fn default() -> Self {
        Self {
            seek: default_seek(),
            long_pause: default_long_pause(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_eager_check")]
    pub eager_check: bool,
}

fn default_eager_check() -> bool {
    true
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            eager_check: default_eager_check(),
        }
    }
}

/// `[preferences]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceSection {
    /// Optional preferences file, watched for live changes. Without it the
    /// preferences live in memory only.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Default for the short-resume flag when the store has no value.
    #[serde(default = "default_fs_on_short_play")]
    pub fs_on_short_play: RawFlag,
}

fn default_fs_on_short_play() -> RawFlag {
    RawFlag::sentinel(true)
}

impl Default for PreferenceSection {
    fn default() -> Self {
        Self {
            path: None,
            fs_on_short_play: default_fs_on_short_play(),
        }
    }
}

/// Validated selectors.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub mount_point: Fingerprint,
    pub player: Fingerprint,
    pub player_view: Fingerprint,
    pub media: Fingerprint,
    pub interruptions: Vec<Fingerprint>,
}

/// Validated delay durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelaySettings {
    pub seek: Duration,
    pub long_pause: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceSettings {
    pub path: Option<PathBuf>,
    pub defaults: Preferences,
}

/// Validated configuration: the form the rest of the crate consumes.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub selectors: Selectors,
    pub delays: DelaySettings,
    pub watch: WatchOptions,
    pub preferences: PreferenceSettings,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        selectors: Selectors,
        delays: DelaySettings,
        watch: WatchOptions,
        preferences: PreferenceSettings,
    ) -> Self {
        Self {
            selectors,
            delays,
            watch,
            preferences,
        }
    }
}
