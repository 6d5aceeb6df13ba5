// tests/guard_phases.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, PlayerPage, start_run};
use crate::common::{init_tracing, settle, with_timeout};

use std::error::Error;
use std::time::Duration;

use playguard::dom::{HostDocument, MediaEvent, MemoryDocument};
use playguard::errors::PlayguardError;
use playguard::guard::{GuardContext, RunOutcome};
use playguard::prefs::{LivePreferences, Preferences};

type TestResult = Result<(), Box<dyn Error>>;

const ON: Preferences = Preferences {
    fs_on_short_play: true,
};
const OFF: Preferences = Preferences {
    fs_on_short_play: false,
};

#[tokio::test]
async fn backup_request_uses_the_recycled_player() -> TestResult {
    init_tracing();
    let page = PlayerPage::new();
    let ctx = page.guard(&ConfigFileBuilder::new().build(), ON);

    let run = start_run(&ctx, 1);
    settle().await;
    assert!(page.doc.fullscreen_requests().is_empty());

    let first = page.insert_player();
    settle().await;
    assert_eq!(page.doc.fullscreen_requests(), vec![first]);
    assert_eq!(page.doc.fullscreen_element(), Some(first));

    // The host swaps the player for an equivalent node before the view
    // shows up; fullscreen is lost with the old node.
    let second = page.doc.recycle(first)?;
    settle().await;
    assert_eq!(page.doc.fullscreen_element(), None);

    page.insert_view(second);
    settle().await;
    assert_eq!(page.doc.fullscreen_requests(), vec![first, second]);
    assert_eq!(page.doc.fullscreen_element(), Some(second));

    ctx.watcher.supersede();
    assert_eq!(with_timeout(run).await?, RunOutcome::Superseded);
    Ok(())
}

#[tokio::test]
async fn no_request_while_already_fullscreen() -> TestResult {
    init_tracing();
    let page = PlayerPage::new();
    let ctx = page.guard(&ConfigFileBuilder::new().build(), ON);

    let run = start_run(&ctx, 1);
    let player = page.insert_player();
    settle().await;
    page.insert_view(player);
    settle().await;

    // The view request found the player already fullscreen.
    assert_eq!(page.doc.fullscreen_requests(), vec![player]);

    ctx.watcher.supersede();
    with_timeout(run).await?;
    Ok(())
}

#[tokio::test]
async fn superseded_run_has_no_further_side_effects() -> TestResult {
    init_tracing();
    let page = PlayerPage::new();
    page.doc.set_reject_fullscreen(true);
    let ctx = page.guard(&ConfigFileBuilder::new().build(), ON);

    let run1 = start_run(&ctx, 1);
    let player = page.insert_player();
    settle().await;
    assert_eq!(page.doc.fullscreen_requests().len(), 1, "run #1 reached AwaitPlayerView");

    let run2 = start_run(&ctx, 2);
    assert_eq!(with_timeout(run1).await?, RunOutcome::Superseded);
    settle().await;
    // Run #2 found the player at once.
    assert_eq!(page.doc.fullscreen_requests().len(), 2);

    let view = page.insert_view(player);
    let video = page.insert_video(view);
    settle().await;

    // Only run #2 reacted to the view and attached to the video.
    assert_eq!(page.doc.fullscreen_requests().len(), 3);
    assert_eq!(page.doc.listener_count(video), 1);
    assert_eq!(page.doc.peak_subscriptions(), 1);

    ctx.watcher.supersede();
    assert_eq!(with_timeout(run2).await?, RunOutcome::Superseded);
    settle().await;
    assert_eq!(page.doc.active_subscriptions(), 0);
    Ok(())
}

#[tokio::test]
async fn listeners_of_superseded_runs_are_inert() -> TestResult {
    init_tracing();
    let page = PlayerPage::new();
    page.doc.set_reject_fullscreen(true);
    let ctx = page.guard(&ConfigFileBuilder::new().build(), ON);

    let run = start_run(&ctx, 1);
    let (_player, _view, video) = page.insert_full_player();
    settle().await;
    assert_eq!(page.doc.listener_count(video), 1);
    let before = page.doc.fullscreen_requests().len();

    ctx.watcher.supersede();
    with_timeout(run).await?;

    page.doc.dispatch_media(video, MediaEvent::Pause);
    page.doc.dispatch_media(video, MediaEvent::Play);
    assert_eq!(page.doc.fullscreen_requests().len(), before);
    assert_eq!(ctx.delays.long_pause.status(), playguard::delay::DelayStatus::Unset);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn short_resume_follows_the_preference() -> TestResult {
    init_tracing();
    let page = PlayerPage::new();
    page.doc.set_reject_fullscreen(true);
    let ctx = page.guard(&ConfigFileBuilder::new().build(), OFF);

    let run = start_run(&ctx, 1);
    let (_player, _view, video) = page.insert_full_player();
    settle().await;
    let baseline = page.doc.fullscreen_requests().len();

    page.doc.dispatch_media(video, MediaEvent::Pause);
    tokio::time::advance(Duration::from_secs(10)).await;
    page.doc.dispatch_media(video, MediaEvent::Play);
    assert_eq!(page.doc.fullscreen_requests().len(), baseline, "off: no request");

    ctx.prefs.replace(ON);
    page.doc.dispatch_media(video, MediaEvent::Pause);
    tokio::time::advance(Duration::from_secs(10)).await;
    page.doc.dispatch_media(video, MediaEvent::Play);
    assert_eq!(page.doc.fullscreen_requests().len(), baseline + 1, "on: request");

    ctx.watcher.supersede();
    with_timeout(run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn long_pause_forces_the_request() -> TestResult {
    init_tracing();
    let page = PlayerPage::new();
    page.doc.set_reject_fullscreen(true);
    let cfg = ConfigFileBuilder::new().with_delays("1s", "5m").build();
    let ctx = page.guard(&cfg, OFF);

    let run = start_run(&ctx, 1);
    let (player, _view, video) = page.insert_full_player();
    settle().await;
    let baseline = page.doc.fullscreen_requests().len();

    page.doc.dispatch_media(video, MediaEvent::Pause);
    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    page.doc.dispatch_media(video, MediaEvent::Play);

    let requests = page.doc.fullscreen_requests();
    assert_eq!(requests.len(), baseline + 1);
    assert_eq!(requests.last(), Some(&player));

    // The pause window was cleared by the resume.
    page.doc.dispatch_media(video, MediaEvent::Pause);
    page.doc.dispatch_media(video, MediaEvent::Play);
    assert_eq!(page.doc.fullscreen_requests().len(), baseline + 1);

    ctx.watcher.supersede();
    with_timeout(run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn resume_right_after_seek_is_suppressed() -> TestResult {
    init_tracing();
    let page = PlayerPage::new();
    page.doc.set_reject_fullscreen(true);
    let ctx = page.guard(&ConfigFileBuilder::new().build(), ON);

    let run = start_run(&ctx, 1);
    let (_player, _view, video) = page.insert_full_player();
    settle().await;
    let baseline = page.doc.fullscreen_requests().len();

    // Even a long pause does not win over a fresh seek.
    page.doc.dispatch_media(video, MediaEvent::Pause);
    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    page.doc.dispatch_media(video, MediaEvent::Seeking);
    page.doc.dispatch_media(video, MediaEvent::Play);
    assert_eq!(page.doc.fullscreen_requests().len(), baseline);

    tokio::time::advance(Duration::from_secs(2)).await;
    page.doc.dispatch_media(video, MediaEvent::Pause);
    page.doc.dispatch_media(video, MediaEvent::Play);
    assert_eq!(page.doc.fullscreen_requests().len(), baseline + 1);

    ctx.watcher.supersede();
    with_timeout(run).await?;
    Ok(())
}

#[tokio::test]
async fn banner_removal_re_arms_without_double_attach() -> TestResult {
    init_tracing();
    let page = PlayerPage::new();
    page.doc.set_reject_fullscreen(true);
    let ctx = page.guard(&ConfigFileBuilder::new().build(), ON);

    let run = start_run(&ctx, 1);
    let (player, _view, video) = page.insert_full_player();
    settle().await;
    assert_eq!(page.doc.fullscreen_requests().len(), 2);

    let banner = page.insert_banner(player);
    settle().await;
    // Noted, but the phase goes on.
    assert_eq!(page.doc.fullscreen_requests().len(), 2);

    page.doc.remove(banner);
    settle().await;
    // Back through AwaitPlayer and AwaitPlayerView: both requests again.
    assert_eq!(page.doc.fullscreen_requests().len(), 4);
    assert_eq!(page.doc.listener_count(video), 1);
    assert!(!run.is_finished());

    ctx.watcher.supersede();
    with_timeout(run).await?;
    Ok(())
}

#[tokio::test]
async fn replaced_video_gets_fresh_listeners() -> TestResult {
    init_tracing();
    let page = PlayerPage::new();
    let ctx = page.guard(&ConfigFileBuilder::new().build(), ON);

    let run = start_run(&ctx, 1);
    let (_player, _view, video) = page.insert_full_player();
    settle().await;

    let replacement = page.doc.recycle(video)?;
    settle().await;
    // Back at phase 3 after the re-arm: the new node is attached once.
    assert_eq!(page.doc.listener_count(replacement), 1);

    ctx.watcher.supersede();
    with_timeout(run).await?;
    Ok(())
}

#[tokio::test]
async fn closed_source_ends_the_run() -> TestResult {
    init_tracing();
    let page = PlayerPage::new();
    let ctx = page.guard(&ConfigFileBuilder::new().build(), ON);

    let run = start_run(&ctx, 1);
    settle().await;
    page.doc.teardown();
    assert_eq!(with_timeout(run).await?, RunOutcome::SourceClosed);
    Ok(())
}

#[test]
fn missing_mount_point_is_fatal() {
    let doc = MemoryDocument::new();
    doc.append(doc.document_root(), "div#somethingElse").unwrap();
    let err = GuardContext::new(
        std::sync::Arc::new(doc),
        &ConfigFileBuilder::new().build(),
        LivePreferences::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PlayguardError::MissingRoot(_)), "{err}");
}
