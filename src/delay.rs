// src/delay.rs

//! Debounce windows.
//!
//! A [`Delay`] remembers when it was last triggered and answers, lazily at
//! query time, whether its duration has elapsed since. There is no
//! background timer. Uses `tokio::time::Instant` so tests can drive it with
//! a paused clock.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Derived state of a [`Delay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayStatus {
    /// Never triggered, or reset since.
    Unset,
    /// Triggered and the duration has not elapsed yet.
    Pending,
    /// Triggered and the duration has elapsed.
    Passed,
}

#[derive(Debug)]
pub struct Delay {
    name: &'static str,
    duration: Duration,
    triggered_at: Mutex<Option<Instant>>,
}

impl Delay {
    pub fn new(name: &'static str, duration: Duration) -> Self {
        Self {
            name,
            duration,
            triggered_at: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, Option<Instant>> {
        self.triggered_at.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Record "now" as the trigger time (restarting the window).
    pub fn trigger(&self) {
        trace!(delay = self.name, "delay triggered");
        *self.state() = Some(Instant::now());
    }

    pub fn reset(&self) {
        trace!(delay = self.name, "delay reset");
        *self.state() = None;
    }

    pub fn status(&self) -> DelayStatus {
        match *self.state() {
            None => DelayStatus::Unset,
            Some(at) if at.elapsed() >= self.duration => DelayStatus::Passed,
            Some(_) => DelayStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == DelayStatus::Pending
    }

    pub fn has_passed(&self) -> bool {
        self.status() == DelayStatus::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn walks_through_unset_pending_passed_unset() {
        let delay = Delay::new("seek", Duration::from_millis(1000));
        assert_eq!(delay.status(), DelayStatus::Unset);
        assert!(!delay.is_pending() && !delay.has_passed());

        delay.trigger();
        assert_eq!(delay.status(), DelayStatus::Pending);

        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(delay.status(), DelayStatus::Pending);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(delay.status(), DelayStatus::Passed);

        delay.reset();
        assert_eq!(delay.status(), DelayStatus::Unset);
    }

    #[tokio::test(start_paused = true)]
    async fn retrigger_restarts_the_window() {
        let delay = Delay::new("pause", Duration::from_secs(10));
        delay.trigger();
        tokio::time::advance(Duration::from_secs(8)).await;
        delay.trigger();
        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(delay.is_pending());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(delay.has_passed());
    }
}
