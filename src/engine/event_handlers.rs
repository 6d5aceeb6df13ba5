// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::debug;

use crate::guard::RunOutcome;
use crate::types::{EntryReason, RunId};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Supersede this run: its pending wait is cancelled and its listeners
    /// go inert. Always issued before the `StartRun` that replaces it.
    CancelRun { run_id: RunId },
    /// Spawn a new guard run.
    StartRun { run_id: RunId, reason: EntryReason },
    /// Re-read the preference store into the live preferences.
    ReloadPreferences,
    /// Request that the process exits.
    RequestExit,
}

/// Decision returned by the core after handling a single `EngineEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Run id allocation and the currently active run.
#[derive(Debug, Default)]
pub struct RunTracker {
    last_issued: u64,
    active: Option<RunId>,
}

impl RunTracker {
    pub fn active(&self) -> Option<RunId> {
        self.active
    }

    pub fn last_issued(&self) -> Option<RunId> {
        (self.last_issued > 0).then_some(RunId(self.last_issued))
    }

    fn issue(&mut self) -> RunId {
        self.last_issued += 1;
        let id = RunId(self.last_issued);
        self.active = Some(id);
        id
    }
}

/// Handle the re-entry signal.
///
/// The active run (if any) is cancelled first, then a run with the next id
/// is started. Repeated signals simply chain supersessions.
pub fn handle_entry(runs: &mut RunTracker, reason: EntryReason) -> CoreStep {
    let mut commands = Vec::with_capacity(2);
    if let Some(run_id) = runs.active.take() {
        commands.push(CoreCommand::CancelRun { run_id });
    }
    let run_id = runs.issue();
    commands.push(CoreCommand::StartRun { run_id, reason });
    CoreStep::running(commands)
}

pub fn handle_preferences_changed() -> CoreStep {
    CoreStep::running(vec![CoreCommand::ReloadPreferences])
}

/// Handle a run exiting.
///
/// Exits of superseded runs are expected and change nothing. If the active
/// run exits on its own (its change source closed), no run is active until
/// the next re-entry signal.
pub fn handle_run_exit(runs: &mut RunTracker, run_id: RunId, outcome: RunOutcome) -> CoreStep {
    if runs.active == Some(run_id) {
        debug!(run_id = %run_id, ?outcome, "active run exited");
        runs.active = None;
    } else {
        debug!(run_id = %run_id, ?outcome, "stale run exited");
    }
    CoreStep::running(Vec::new())
}

/// Handle a shutdown request: cancel the active run and stop.
pub fn handle_shutdown(runs: &mut RunTracker) -> CoreStep {
    let mut commands = Vec::with_capacity(2);
    if let Some(run_id) = runs.active.take() {
        commands.push(CoreCommand::CancelRun { run_id });
    }
    commands.push(CoreCommand::RequestExit);
    CoreStep {
        commands,
        keep_running: false,
    }
}
