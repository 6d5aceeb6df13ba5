// src/watch/mod.rs

//! Condition watching over the host tree.
//!
//! This module is responsible for:
//! - Suspending until a predicate over the live tree yields a value
//!   ([`Watcher`]), re-evaluating it on every change signal.
//! - Keeping at most one watch outstanding per engine instance, cancelling
//!   the previous one before a new one subscribes.
//! - Scoping waits to a run via [`WatchSession`]: once the watcher is
//!   superseded, every wait requested by an older session aborts.
//! - Fingerprint-level helpers built on the base primitive ([`conditions`]).
//!
//! It does **not** know about players, fullscreen, or preferences.

use thiserror::Error;

pub mod conditions;
pub mod watcher;

pub use conditions::Observation;
pub use watcher::{WatchOptions, WatchSession, Watcher};

/// Non-success terminal states of a watch.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WatchError {
    /// Superseded by a newer watch or run. Expected; callers stop quietly.
    #[error("watch aborted: superseded by a newer watch or run")]
    Aborted,

    /// The change source went away before the predicate matched.
    #[error("change source closed before the condition matched")]
    SourceClosed,
}
