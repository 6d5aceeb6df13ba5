// src/engine/mod.rs

//! Orchestration engine for playguard.
//!
//! This module ties together:
//! - run bookkeeping (which run id is current, which ones are stale)
//! - the main runtime event loop that reacts to:
//!   - page entry / navigation (the re-entry signal)
//!   - preference changes
//!   - guard runs exiting
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::guard::RunOutcome;
use crate::types::{EntryReason, RunId};

/// Events flowing into the runtime from the host, the preference store and
/// the guard runs themselves.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The guard should (re-)enter: supersede the current run and start a
    /// fresh one.
    Entered { reason: EntryReason },
    /// The preference store reported a change.
    PreferencesChanged,
    /// A guard run ended.
    RunExited { run_id: RunId, outcome: RunOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C, end of a replay).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{Runtime, spawn_preference_forwarder};
