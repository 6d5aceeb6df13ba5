// tests/scenario_replay.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::sync::Arc;

use tokio::sync::mpsc;

use playguard::cli::CliArgs;
use playguard::dom::{HostDocument, MemoryDocument};
use playguard::engine::{CoreRuntime, EngineEvent, Runtime, spawn_preference_forwarder};
use playguard::guard::GuardContext;
use playguard::prefs::{LivePreferences, MemoryPreferenceStore, PreferenceStore};
use playguard::scenario::{Scenario, ScenarioPlayer, describe_node};
use playguard::types::EntryReason;

type TestResult = Result<(), Box<dyn Error>>;

/// Player appears, user leaves fullscreen, pauses briefly with the
/// short-resume flag off, then pauses for a long time.
const SESSION: &str = r#"
settle = "1s"

[[setup]]
action = "insert"
parent = "document"
element = "div#appMountPoint"
name = "mount"

[[step]]
at = "100ms"
action = "insert"
parent = "mount"
element = "div.watch-video"
name = "player"

[[step]]
at = "200ms"
action = "insert"
parent = "player"
element = "div.watch-video--player-view"
name = "view"

[[step]]
at = "250ms"
action = "insert"
parent = "view"
element = "video"
name = "video"

[[step]]
at = "1s"
action = "exit_fullscreen"

[[step]]
at = "1s"
action = "set_preference"
fs_on_short_play = "false"

[[step]]
at = "2s"
action = "media"
target = "video"
event = "pause"

[[step]]
at = "3s"
action = "media"
target = "video"
event = "play"

[[step]]
at = "4s"
action = "media"
target = "video"
event = "pause"

[[step]]
at = "10m"
action = "media"
target = "video"
event = "play"
"#;

#[tokio::test(start_paused = true)]
async fn replayed_session_requests_fullscreen_at_the_right_moments() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let scenario = Scenario::from_toml(SESSION)?;

    let store: Arc<dyn PreferenceStore> = Arc::new(MemoryPreferenceStore::new());
    let defaults = cfg.preferences.defaults;
    let prefs = LivePreferences::new(defaults);
    let (tx, rx) = mpsc::channel::<EngineEvent>(64);

    let document = MemoryDocument::new();
    let mut player = ScenarioPlayer::new(document.clone(), Arc::clone(&store), tx.clone());
    player.apply_setup(&scenario.setup).await?;

    let host: Arc<dyn HostDocument> = Arc::new(document.clone());
    let guard = Arc::new(GuardContext::new(host, &cfg, prefs)?);
    let _forwarder = spawn_preference_forwarder(store.as_ref(), tx.clone());

    tx.send(EngineEvent::Entered {
        reason: EntryReason::PageLoad,
    })
    .await?;
    let timeline = scenario
        .timeline()?
        .into_iter()
        .map(|(at, action)| (at, action.clone()))
        .collect();
    let replay = tokio::spawn(player.play(timeline, scenario.settle_duration()?));

    let runtime = Runtime::new(CoreRuntime::new(), rx, tx, Arc::clone(&guard), store, defaults);
    runtime.run().await?;
    replay.await?;

    // Player appeared; the view found it fullscreen already; the short
    // resume was gated off; the long one was forced.
    let requests = document.fullscreen_requests();
    assert_eq!(requests.len(), 2, "{requests:?}");
    assert!(
        requests
            .iter()
            .all(|n| describe_node(&document, *n) == "div.watch-video")
    );
    assert!(!guard.prefs.current().fs_on_short_play);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn run_replays_a_scenario_file_end_to_end() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let scenario_path = dir.path().join("session.toml");
    fs::write(&scenario_path, SESSION)?;
    let config_path = dir.path().join("Playguard.toml");
    fs::write(
        &config_path,
        "[delays]\nseek = \"500ms\"\nlong_pause = \"2m\"\n",
    )?;

    let args = CliArgs {
        config: config_path.display().to_string(),
        scenario: scenario_path.display().to_string(),
        log_level: None,
        dry_run: false,
    };
    // Virtual time: the ten-minute session replays instantly.
    playguard::run(args).await?;
    Ok(())
}

/// The short-resume flag is switched off before the engine starts.
const FLAG_OFF_IN_SETUP: &str = r#"
settle = "100ms"

[[setup]]
action = "insert"
parent = "document"
element = "div#appMountPoint"
name = "mount"

[[setup]]
action = "set_preference"
fs_on_short_play = "false"

[[setup]]
action = "insert"
parent = "mount"
element = "div.watch-video"
name = "player"

[[setup]]
action = "insert"
parent = "player"
element = "div.watch-video--player-view"
name = "view"

[[setup]]
action = "insert"
parent = "view"
element = "video"
name = "video"

[[step]]
at = "100ms"
action = "exit_fullscreen"

[[step]]
at = "200ms"
action = "media"
target = "video"
event = "pause"

[[step]]
at = "220ms"
action = "media"
target = "video"
event = "play"
"#;

#[tokio::test(start_paused = true)]
async fn preferences_written_during_setup_gate_the_first_run() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let scenario = Scenario::from_toml(FLAG_OFF_IN_SETUP)?;

    let document = playguard::replay_session(&cfg, &scenario).await?;

    // Only the initial player request; the short resume stays gated.
    let requests = document.fullscreen_requests();
    assert_eq!(requests.len(), 1, "{requests:?}");
    Ok(())
}

#[tokio::test]
async fn missing_mount_point_aborts_the_replay() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let scenario_path = dir.path().join("session.toml");
    fs::write(
        &scenario_path,
        "[[setup]]\naction = \"insert\"\nparent = \"document\"\nelement = \"div#other\"\n",
    )?;

    let args = CliArgs {
        config: dir.path().join("absent.toml").display().to_string(),
        scenario: scenario_path.display().to_string(),
        log_level: None,
        dry_run: false,
    };
    let err = playguard::run(args).await.unwrap_err();
    assert!(err.to_string().contains("Missing root"), "{err}");
    Ok(())
}

#[tokio::test]
async fn dry_run_validates_without_replaying() -> TestResult {
    let dir = tempfile::tempdir()?;
    let scenario_path = dir.path().join("session.toml");
    fs::write(&scenario_path, SESSION)?;

    let args = CliArgs {
        config: dir.path().join("absent.toml").display().to_string(),
        scenario: scenario_path.display().to_string(),
        log_level: None,
        dry_run: true,
    };
    playguard::run(args).await?;

    fs::write(&scenario_path, "[[step]]\nat = \"later\"\naction = \"navigate\"\n")?;
    let args = CliArgs {
        config: dir.path().join("absent.toml").display().to_string(),
        scenario: scenario_path.display().to_string(),
        log_level: None,
        dry_run: true,
    };
    assert!(playguard::run(args).await.is_err());
    Ok(())
}
