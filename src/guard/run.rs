// src/guard/run.rs

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;

use tracing::{debug, error, info};

use super::media::attach_media_listeners;
use super::{GuardContext, Phase, RunOutcome};
use crate::dom::NodeId;
use crate::types::RunId;
use crate::watch::{Observation, WatchError, WatchSession};

/// One execution of the guard state machine.
///
/// The run's [`WatchSession`] is captured at construction, so a run must be
/// created after the previous one was superseded.
#[derive(Debug)]
pub struct GuardRun {
    id: RunId,
    ctx: Arc<GuardContext>,
    session: WatchSession,
    phase: Phase,
    /// Media nodes this run already attached listeners to.
    attached: HashSet<NodeId>,
}

impl GuardRun {
    pub fn new(id: RunId, ctx: Arc<GuardContext>) -> Self {
        let session = ctx.watcher.session();
        Self {
            id,
            ctx,
            session,
            phase: Phase::AwaitPlayer,
            attached: HashSet::new(),
        }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Drive the phases until the run is superseded or the source closes.
    pub async fn run(mut self) -> RunOutcome {
        info!(run_id = %self.id, "guard run started");

        let err = match self.guard().await {
            Ok(never) => match never {},
            Err(err) => err,
        };

        let outcome = match err {
            WatchError::Aborted => {
                debug!(run_id = %self.id, phase = %self.phase, "guard run superseded");
                RunOutcome::Superseded
            }
            WatchError::SourceClosed => {
                error!(run_id = %self.id, phase = %self.phase, "change source closed; guard run ended");
                RunOutcome::SourceClosed
            }
        };
        info!(run_id = %self.id, ?outcome, "guard run exited");
        outcome
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        info!(run_id = %self.id, phase = %phase, "entering phase");
    }

    async fn guard(&mut self) -> Result<Infallible, WatchError> {
        let ctx = Arc::clone(&self.ctx);
        let mount = ctx.mount_point;

        loop {
            self.enter(Phase::AwaitPlayer);
            let player = self
                .session
                .until_element(mount, &ctx.selectors.player)
                .await?;
            // Request ASAP: the host only honours requests close to the
            // user gesture that opened the player.
            ctx.request_fullscreen(&self.session, self.id, player, "player appeared");

            self.enter(Phase::AwaitPlayerView);
            self.session
                .until_element(mount, &ctx.selectors.player_view)
                .await?;
            // Backup request on the live player; the first one may have gone
            // to a node that was recycled since.
            let Some(player) = ctx.live_player() else {
                debug!(run_id = %self.id, "player vanished before its view settled");
                continue;
            };
            ctx.request_fullscreen(&self.session, self.id, player, "player view appeared");

            self.enter(Phase::AttachAndWaitForInterrupt);
            self.await_interruption(player).await?;
        }
    }

    /// Attach to media and note banners inside `player` until one of the
    /// watched nodes (the player included) disconnects.
    async fn await_interruption(&mut self, player: NodeId) -> Result<(), WatchError> {
        let ctx = Arc::clone(&self.ctx);
        let fingerprints = ctx.playback_fingerprints();
        let mut seen: Vec<NodeId> = Vec::new();

        loop {
            let observation = self
                .session
                .until_change_among(ctx.mount_point, player, fingerprints, &seen)
                .await?;

            match observation {
                Observation::Appeared { index: 0, node } => {
                    if self.attached.insert(node) {
                        attach_media_listeners(&ctx, self.session.clone(), self.id, node);
                    }
                    seen.push(node);
                }
                Observation::Appeared { index, node } => {
                    info!(
                        run_id = %self.id,
                        fingerprint = %fingerprints[index],
                        "playback interrupted"
                    );
                    seen.push(node);
                }
                Observation::Disconnected { node } => {
                    info!(run_id = %self.id, ?node, "watched node disconnected; re-arming");
                    return Ok(());
                }
            }
        }
    }
}
