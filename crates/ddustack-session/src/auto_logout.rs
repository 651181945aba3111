//! Countdown that signs the user out after a fixed delay.
//!
//! Used by kiosk-style screens: once armed, the session is cleared
//! locally when the deadline passes unless the timer is cancelled first.

use std::sync::Arc;
use std::time::Duration;

use ddustack_transport::ApiTransport;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::Gatekeeper;

/// Default countdown for the auto-logout screen.
pub const DEFAULT_AUTO_LOGOUT: Duration = Duration::from_secs(45);

/// A running auto-logout countdown. Dropping it cancels the countdown.
#[derive(Debug)]
pub struct AutoLogout {
    deadline: Instant,
    task: JoinHandle<()>,
}

impl AutoLogout {
    /// Arms a countdown that calls [`Gatekeeper::clear`] after `after`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<T: ApiTransport>(gatekeeper: Arc<Gatekeeper<T>>, after: Duration) -> Self {
        let deadline = Instant::now() + after;
        tracing::debug!(?after, "auto-logout armed");

        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            tracing::info!("auto-logout deadline reached");
            gatekeeper.clear();
        });

        Self { deadline, task }
    }

    /// Time left before the session is cleared; zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whole seconds left, rounded up, for a countdown display.
    pub fn remaining_secs(&self) -> u64 {
        let remaining = self.remaining();
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    /// `true` once the session has been cleared or the timer cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the countdown without touching the session.
    pub fn cancel(self) {
        tracing::debug!("auto-logout cancelled");
        // Drop aborts the task.
    }
}

impl Drop for AutoLogout {
    fn drop(&mut self) {
        self.task.abort();
    }
}
