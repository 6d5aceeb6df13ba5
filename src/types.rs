use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Identifier of one guard run.
///
/// Allocated by the engine core from a monotonically increasing counter; a
/// higher id always supersedes a lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Playback events a media element reports to attached listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEvent {
    Play,
    Seeking,
    Pause,
}

impl FromStr for MediaEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "play" => Ok(MediaEvent::Play),
            "seeking" | "seek" => Ok(MediaEvent::Seeking),
            "pause" => Ok(MediaEvent::Pause),
            other => Err(format!(
                "invalid media event: {other} (expected \"play\", \"seeking\" or \"pause\")"
            )),
        }
    }
}

/// Why the guard is (re-)entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryReason {
    /// Initial entry when the page is loaded.
    PageLoad,
    /// The host navigated (history pop); the previous run is stale.
    Navigation,
}
