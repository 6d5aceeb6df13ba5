// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`EngineEvent`]s and produces:
//! - an updated core state (run counter, active run)
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - cancelling and spawning guard runs
//! - reloading preferences
//!
//! The core is unit tested without any Tokio, channels or host document.

use crate::engine::EngineEvent;
use crate::engine::event_handlers::{
    CoreStep, RunTracker, handle_entry, handle_preferences_changed, handle_run_exit,
    handle_shutdown,
};
use crate::types::RunId;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug, Default)]
pub struct CoreRuntime {
    runs: RunTracker,
}

impl CoreRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// The run that is currently allowed to have side effects.
    pub fn active_run(&self) -> Option<RunId> {
        self.runs.active()
    }

    pub fn last_issued_run(&self) -> Option<RunId> {
        self.runs.last_issued()
    }

    /// Handle a single engine event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: EngineEvent) -> CoreStep {
        match event {
            EngineEvent::Entered { reason } => handle_entry(&mut self.runs, reason),
            EngineEvent::PreferencesChanged => handle_preferences_changed(),
            EngineEvent::RunExited { run_id, outcome } => {
                handle_run_exit(&mut self.runs, run_id, outcome)
            }
            EngineEvent::ShutdownRequested => handle_shutdown(&mut self.runs),
        }
    }
}
