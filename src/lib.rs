// src/lib.rs

pub mod cli;
pub mod config;
pub mod delay;
pub mod dom;
pub mod engine;
pub mod errors;
pub mod guard;
pub mod logging;
pub mod prefs;
pub mod scenario;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default};
use crate::dom::{HostDocument, MemoryDocument};
use crate::engine::{CoreRuntime, EngineEvent, Runtime, spawn_preference_forwarder};
use crate::errors::PlayguardError;
use crate::guard::GuardContext;
use crate::prefs::{FilePreferenceStore, LivePreferences, MemoryPreferenceStore, PreferenceStore};
use crate::scenario::{Scenario, ScenarioPlayer, describe_node};
use crate::types::EntryReason;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config and scenario loading
/// - the preference store and its change forwarding
/// - the in-memory document, prepared by the scenario's setup
/// - the core runtime and its async shell
/// - the scenario replay
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;
    let scenario = Scenario::load(&args.scenario)?;

    if args.dry_run {
        print_dry_run(&cfg, &scenario)?;
        return Ok(());
    }

    let document = replay_session(&cfg, &scenario).await?;
    print_summary(&document);
    Ok(())
}

/// Replay `scenario` against a fresh in-memory document under `cfg`.
///
/// Returns the document once the engine has shut down so callers can
/// inspect what the guard did to it.
pub async fn replay_session(cfg: &ConfigFile, scenario: &Scenario) -> Result<MemoryDocument> {
    let store: Arc<dyn PreferenceStore> = match &cfg.preferences.path {
        Some(path) => Arc::new(FilePreferenceStore::watch(path)?),
        None => Arc::new(MemoryPreferenceStore::new()),
    };
    let defaults = cfg.preferences.defaults;

    // Engine event channel.
    let (tx, rx) = mpsc::channel::<EngineEvent>(64);

    let document = MemoryDocument::new();
    let mut player = ScenarioPlayer::new(document.clone(), Arc::clone(&store), tx.clone());
    player.apply_setup(&scenario.setup).await?;

    // Setup may have written preferences; the forwarder only reports
    // changes made after it subscribes.
    let prefs = LivePreferences::new(defaults);
    prefs.reload(store.as_ref(), defaults)?;

    let host: Arc<dyn HostDocument> = Arc::new(document.clone());
    let guard = match GuardContext::new(host, cfg, prefs) {
        Ok(guard) => Arc::new(guard),
        Err(e @ PlayguardError::MissingRoot(_)) => {
            error!("{e}; this page is not one playguard can work on");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let _forwarder = spawn_preference_forwarder(store.as_ref(), tx.clone());

    // Ctrl-C → graceful shutdown.
    let ctrl_c = {
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(EngineEvent::ShutdownRequested).await;
        })
    };

    tx.send(EngineEvent::Entered {
        reason: EntryReason::PageLoad,
    })
    .await?;

    let timeline = scenario
        .timeline()?
        .into_iter()
        .map(|(at, action)| (at, action.clone()))
        .collect();
    let settle = scenario.settle_duration()?;
    let replay = tokio::spawn(player.play(timeline, settle));

    let runtime = Runtime::new(CoreRuntime::new(), rx, tx, guard, store, defaults);
    let result = runtime.run().await;
    replay.abort();
    ctrl_c.abort();

    result?;
    Ok(document)
}

/// Simple dry-run output: print the effective settings and the replay plan.
fn print_dry_run(cfg: &ConfigFile, scenario: &Scenario) -> Result<()> {
    println!("playguard dry-run");
    println!("selectors:");
    println!("  mount_point = {}", cfg.selectors.mount_point);
    println!("  player = {}", cfg.selectors.player);
    println!("  player_view = {}", cfg.selectors.player_view);
    println!("  media = {}", cfg.selectors.media);
    for fp in &cfg.selectors.interruptions {
        println!("  interruption = {fp}");
    }
    println!("delays:");
    println!("  seek = {:?}", cfg.delays.seek);
    println!("  long_pause = {:?}", cfg.delays.long_pause);
    println!("watch.eager_check = {}", cfg.watch.eager_check);
    match &cfg.preferences.path {
        Some(path) => println!("preferences.path = {}", path.display()),
        None => println!("preferences.path = (in memory)"),
    }
    println!(
        "preferences.fs_on_short_play (default) = {}",
        cfg.preferences.defaults.fs_on_short_play
    );
    println!();

    println!("setup ({}):", scenario.setup.len());
    for action in &scenario.setup {
        println!("  - {action:?}");
    }
    let timeline = scenario.timeline()?;
    println!("steps ({}):", timeline.len());
    for (at, action) in timeline {
        println!("  - +{at:?} {action:?}");
    }
    println!("settle = {:?}", scenario.settle_duration()?);

    debug!("dry-run complete (nothing replayed)");
    Ok(())
}

fn print_summary(document: &MemoryDocument) {
    let requests = document.fullscreen_requests();
    info!(count = requests.len(), "fullscreen requests issued");
    println!("fullscreen requests ({}):", requests.len());
    for node in requests {
        println!("  - {} ({node:?})", describe_node(document, node));
    }
}
