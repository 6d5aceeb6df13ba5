// src/config/mod.rs

//! Configuration loading and validation for playguard.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate fingerprints and durations into typed settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, DelaySection, DelaySettings, PreferenceSection, PreferenceSettings, RawConfigFile,
    SelectorSection, Selectors, WatchSection,
};
pub use validate::parse_duration;
