// src/guard/media.rs

//! Media listeners: what a run attaches to each media element.
//!
//! - `seeking` triggers the seek window,
//! - `pause` triggers the long-pause window,
//! - `play` decides via [`resume_decision`] whether to request fullscreen
//!   again, then clears the long-pause window.
//!
//! Listeners hold only a weak reference to the [`GuardContext`] and their
//! run's [`WatchSession`]; once the run is superseded they do nothing.

use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use super::GuardContext;
use crate::delay::DelayStatus;
use crate::dom::{MediaEvent, NodeId};
use crate::prefs::Preferences;
use crate::types::RunId;
use crate::watch::WatchSession;

/// Why a resume does or does not lead to a fullscreen request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    /// A seek just happened; the resume is part of it.
    SuppressedBySeek,
    /// The pause lasted long enough that the preference is overridden.
    ForcedByLongPause,
    /// Short pause: the user's preference decides.
    Preference(bool),
}

impl ResumeDecision {
    pub fn requests_fullscreen(self) -> bool {
        match self {
            ResumeDecision::SuppressedBySeek => false,
            ResumeDecision::ForcedByLongPause => true,
            ResumeDecision::Preference(on) => on,
        }
    }
}

pub fn resume_decision(
    seek: DelayStatus,
    long_pause: DelayStatus,
    prefs: Preferences,
) -> ResumeDecision {
    if seek == DelayStatus::Pending {
        ResumeDecision::SuppressedBySeek
    } else if long_pause == DelayStatus::Passed {
        ResumeDecision::ForcedByLongPause
    } else {
        ResumeDecision::Preference(prefs.fs_on_short_play)
    }
}

/// Bind the playback reactions of run `run_id` to `media`.
pub fn attach_media_listeners(
    ctx: &Arc<GuardContext>,
    session: WatchSession,
    run_id: RunId,
    media: NodeId,
) {
    debug!(run_id = %run_id, ?media, "attaching media listeners");
    let weak: Weak<GuardContext> = Arc::downgrade(ctx);
    ctx.document.add_media_listener(
        media,
        Arc::new(move |event: MediaEvent| {
            if let Some(ctx) = weak.upgrade() {
                on_media_event(&ctx, &session, run_id, event);
            }
        }),
    );
}

fn on_media_event(ctx: &GuardContext, session: &WatchSession, run_id: RunId, event: MediaEvent) {
    if !session.is_live() {
        trace!(run_id = %run_id, ?event, "ignoring media event for superseded run");
        return;
    }

    match event {
        MediaEvent::Seeking => ctx.delays.seek.trigger(),
        MediaEvent::Pause => ctx.delays.long_pause.trigger(),
        MediaEvent::Play => {
            let decision = resume_decision(
                ctx.delays.seek.status(),
                ctx.delays.long_pause.status(),
                ctx.prefs.current(),
            );
            ctx.delays.long_pause.reset();
            debug!(run_id = %run_id, ?decision, "playback resumed");

            if decision.requests_fullscreen() {
                // The player may have been recycled since attachment.
                if let Some(player) = ctx.live_player() {
                    ctx.request_fullscreen(session, run_id, player, "playback resumed");
                }
            }
        }
    }
}
