// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::guard::{GuardContext, GuardRun};
use crate::prefs::{PreferenceStore, Preferences};
use crate::types::{EntryReason, RunId};

use super::core::CoreRuntime;
use super::{CoreCommand, EngineEvent};

/// Drives guard runs in response to `EngineEvent`s.
///
/// This is a pure IO shell around `CoreRuntime`, which contains the run
/// bookkeeping. This struct handles async IO: reading events from the
/// channel, cancelling and spawning runs, reloading preferences.
pub struct Runtime {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<EngineEvent>,
    event_tx: mpsc::Sender<EngineEvent>,
    guard: Arc<GuardContext>,
    store: Arc<dyn PreferenceStore>,
    defaults: Preferences,
    runs: Vec<(RunId, JoinHandle<()>)>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("spawned_runs", &self.runs.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<EngineEvent>,
        event_tx: mpsc::Sender<EngineEvent>,
        guard: Arc<GuardContext>,
        store: Arc<dyn PreferenceStore>,
        defaults: Preferences,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            guard,
            store,
            defaults,
            runs: Vec::new(),
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `EngineEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (cancel/start runs, reload).
    ///
    /// Returns once shutdown was requested and every spawned run has ended.
    pub async fn run(mut self) -> Result<()> {
        info!("playguard runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command);
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        // Runs report their exit through the channel; closing it first keeps
        // them from blocking on a full buffer nobody drains any more.
        drop(self.event_rx);
        self.guard.watcher.supersede();
        for (run_id, handle) in self.runs.drain(..) {
            if let Err(e) = handle.await {
                warn!(run_id = %run_id, "guard run task failed: {e}");
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Execute a single command from the core.
    fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::CancelRun { run_id } => {
                let epoch = self.guard.watcher.supersede();
                info!(run_id = %run_id, epoch, "run superseded");
            }
            CoreCommand::StartRun { run_id, reason } => {
                self.start_run(run_id, reason);
            }
            CoreCommand::ReloadPreferences => {
                if let Err(e) = self.guard.prefs.reload(self.store.as_ref(), self.defaults) {
                    warn!("failed to reload preferences; keeping previous values: {e}");
                }
            }
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
    }

    fn start_run(&mut self, run_id: RunId, reason: EntryReason) {
        self.runs.retain(|(_, handle)| !handle.is_finished());

        info!(run_id = %run_id, ?reason, "starting guard run");
        // Created here, after any CancelRun of this step, so the run's
        // session belongs to the new epoch.
        let run = GuardRun::new(run_id, Arc::clone(&self.guard));
        let tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            let outcome = run.run().await;
            let _ = tx.send(EngineEvent::RunExited { run_id, outcome }).await;
        });
        self.runs.push((run_id, handle));
    }
}

/// Forward change signals of a preference store into the engine.
///
/// The task ends when either the store or the engine goes away.
pub fn spawn_preference_forwarder(
    store: &dyn PreferenceStore,
    tx: mpsc::Sender<EngineEvent>,
) -> JoinHandle<()> {
    let mut changes = store.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let generation = *changes.borrow_and_update();
            debug!(generation, "preferences changed");
            if tx.send(EngineEvent::PreferencesChanged).await.is_err() {
                break;
            }
        }
        debug!("preference forwarder stopped");
    })
}
