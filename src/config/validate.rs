// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    ConfigFile, DelaySettings, PreferenceSettings, RawConfigFile, SelectorSection, Selectors,
};
use crate::dom::Fingerprint;
use crate::errors::{PlayguardError, Result};
use crate::prefs::Preferences;
use crate::watch::WatchOptions;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PlayguardError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let selectors = validate_selectors(&raw.selectors)?;
        let delays = validate_delays(&raw.delays.seek, &raw.delays.long_pause)?;
        let watch = WatchOptions {
            eager_check: raw.watch.eager_check,
        };
        let preferences = PreferenceSettings {
            path: raw.preferences.path,
            defaults: Preferences {
                fs_on_short_play: raw.preferences.fs_on_short_play.is_on(),
            },
        };
        Ok(ConfigFile::new_unchecked(selectors, delays, watch, preferences))
    }
}

fn selector(field: &str, value: &str) -> Result<Fingerprint> {
    Fingerprint::parse(value).map_err(|e| {
        PlayguardError::ConfigError(format!("[selectors].{field} is not a valid fingerprint: {e}"))
    })
}

fn validate_selectors(raw: &SelectorSection) -> Result<Selectors> {
    if raw.interruptions.is_empty() {
        return Err(PlayguardError::ConfigError(
            "[selectors].interruptions must list at least one fingerprint".to_string(),
        ));
    }
    let interruptions = raw
        .interruptions
        .iter()
        .enumerate()
        .map(|(i, s)| selector(&format!("interruptions[{i}]"), s))
        .collect::<Result<Vec<_>>>()?;

    Ok(Selectors {
        mount_point: selector("mount_point", &raw.mount_point)?,
        player: selector("player", &raw.player)?,
        player_view: selector("player_view", &raw.player_view)?,
        media: selector("media", &raw.media)?,
        interruptions,
    })
}

fn validate_delays(seek: &str, long_pause: &str) -> Result<DelaySettings> {
    let seek = parse_duration(seek)
        .map_err(|e| PlayguardError::ConfigError(format!("[delays].seek: {e}")))?;
    let long_pause = parse_duration(long_pause)
        .map_err(|e| PlayguardError::ConfigError(format!("[delays].long_pause: {e}")))?;

    if seek >= long_pause {
        return Err(PlayguardError::ConfigError(format!(
            "[delays].seek ({seek:?}) must be shorter than [delays].long_pause ({long_pause:?})"
        )));
    }
    Ok(DelaySettings { seek, long_pause })
}

/// Parse a duration like `250ms`, `1s`, `5m` or `2h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let seconds_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
