// src/scenario/model.rs

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::config::parse_duration;
use crate::errors::{PlayguardError, Result};
use crate::prefs::RawFlag;
use crate::types::MediaEvent;

/// A scripted session.
///
/// ```toml
/// settle = "200ms"
///
/// [[setup]]
/// action = "insert"
/// parent = "document"
/// element = "div#appMountPoint"
/// name = "mount"
///
/// [[step]]
/// at = "50ms"
/// action = "insert"
/// parent = "mount"
/// element = "div.watch-video"
/// name = "player"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Applied before the engine starts.
    #[serde(default)]
    pub setup: Vec<Action>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,

    /// How long to keep the engine running after the last step.
    #[serde(default = "default_settle")]
    pub settle: String,
}

fn default_settle() -> String {
    "100ms".to_string()
}

/// One action, scheduled `at` after the replay starts.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(default = "default_at")]
    pub at: String,

    #[serde(flatten)]
    pub action: Action,
}

fn default_at() -> String {
    "0ms".to_string()
}

/// Something the host (or the user) does to the page.
///
/// Targets and parents are either a name bound by an earlier `insert`,
/// `document`, or a fingerprint looked up in the current tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Insert {
        parent: String,
        element: String,
        #[serde(default)]
        name: Option<String>,
    },
    Remove {
        target: String,
    },
    /// Replace the target by a fresh copy with new identities.
    Recycle {
        target: String,
        #[serde(default)]
        name: Option<String>,
    },
    Media {
        target: String,
        event: MediaEvent,
    },
    /// The host navigated: the re-entry signal.
    Navigate,
    /// The options surface wrote a new value.
    SetPreference {
        fs_on_short_play: RawFlag,
    },
    /// The user left fullscreen.
    ExitFullscreen,
    /// Whether the host ignores fullscreen requests from now on.
    RejectFullscreen {
        reject: bool,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Insert { .. } => "insert",
            Action::Remove { .. } => "remove",
            Action::Recycle { .. } => "recycle",
            Action::Media { .. } => "media",
            Action::Navigate => "navigate",
            Action::SetPreference { .. } => "set_preference",
            Action::ExitFullscreen => "exit_fullscreen",
            Action::RejectFullscreen { .. } => "reject_fullscreen",
        }
    }
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(contents)?;
        if let Some(action) = scenario.setup.iter().find(|a| **a == Action::Navigate) {
            return Err(PlayguardError::ScenarioError(format!(
                "'{}' is not allowed in [[setup]]",
                action.kind()
            )));
        }
        // Surface bad durations at load time.
        scenario.timeline()?;
        scenario.settle_duration()?;
        Ok(scenario)
    }

    /// Steps with their offsets, in replay order (stable for equal offsets).
    pub fn timeline(&self) -> Result<Vec<(Duration, &Action)>> {
        let mut timeline = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                parse_duration(&step.at)
                    .map(|at| (at, &step.action))
                    .map_err(|e| PlayguardError::ScenarioError(format!("step[{i}].at: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        timeline.sort_by_key(|(at, _)| *at);
        Ok(timeline)
    }

    pub fn settle_duration(&self) -> Result<Duration> {
        parse_duration(&self.settle)
            .map_err(|e| PlayguardError::ScenarioError(format!("settle: {e}")))
    }
}
