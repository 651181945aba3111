//! Single-flight coordination for the refresh exchange.
//!
//! When an access token expires, every request in flight gets a 401 at
//! roughly the same time. If each of them ran its own refresh exchange,
//! the API would see N refreshes for one expiry, and with rotating refresh
//! tokens the later ones would fail because the first already consumed
//! the credential.
//!
//! [`RefreshGuard`] is an explicit two-state flag:
//!
//! ```text
//!   Idle ──(try_acquire)──→ Refreshing ──(ticket dropped)──→ Idle
//! ```
//!
//! The first caller to see a 401 gets a [`RefreshTicket`] and performs the
//! exchange. Everyone else awaits [`RefreshGuard::wait_idle`] and then
//! reads whatever token the leader stored.
//!
//! The flag lives in a `tokio::sync::watch` channel: flipping it is atomic
//! (`send_if_modified`), and waiters are woken when it changes back.

use tokio::sync::watch;

/// Observable state of a [`RefreshGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// No refresh exchange is in flight.
    Idle,
    /// A leader holds the ticket and is talking to `/auth/refresh/`.
    Refreshing,
}

/// Serializes refresh exchanges: at most one leader at a time.
#[derive(Debug)]
pub struct RefreshGuard {
    state: watch::Sender<GuardState>,
}

impl RefreshGuard {
    pub fn new() -> Self {
        let (state, _) = watch::channel(GuardState::Idle);
        Self { state }
    }

    /// Current state. Only a hint: it may change right after you read it.
    pub fn state(&self) -> GuardState {
        *self.state.borrow()
    }

    /// Becomes the refresh leader if nobody else is.
    ///
    /// Returns `None` when a refresh is already in flight; the caller
    /// should [`wait_idle`](Self::wait_idle) instead of refreshing.
    pub fn try_acquire(&self) -> Option<RefreshTicket<'_>> {
        let acquired = self.state.send_if_modified(|state| {
            if *state == GuardState::Idle {
                *state = GuardState::Refreshing;
                true
            } else {
                false
            }
        });

        if acquired {
            tracing::debug!("refresh guard acquired");
            Some(RefreshTicket { guard: self })
        } else {
            None
        }
    }

    /// Resolves once no refresh is in flight. Returns immediately when idle.
    pub async fn wait_idle(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while
        // we wait and `wait_for` can only return `Ok`.
        let _ = rx.wait_for(|state| *state == GuardState::Idle).await;
    }
}

impl Default for RefreshGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of leadership. Dropping it returns the guard to `Idle`.
///
/// Release happens in `Drop` so it also runs when the leader's future is
/// cancelled or unwinds mid-exchange; later callers never wait forever.
#[must_use = "the guard is released as soon as the ticket is dropped"]
#[derive(Debug)]
pub struct RefreshTicket<'a> {
    guard: &'a RefreshGuard,
}

impl Drop for RefreshTicket<'_> {
    fn drop(&mut self) {
        self.guard.state.send_replace(GuardState::Idle);
        tracing::debug!("refresh guard released");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_new_guard_is_idle() {
        let guard = RefreshGuard::new();
        assert_eq!(guard.state(), GuardState::Idle);
    }

    #[test]
    fn test_try_acquire_second_caller_gets_none() {
        let guard = RefreshGuard::new();

        let ticket = guard.try_acquire();
        assert!(ticket.is_some());
        assert_eq!(guard.state(), GuardState::Refreshing);

        assert!(guard.try_acquire().is_none(), "only one leader at a time");
    }

    #[test]
    fn test_dropping_ticket_returns_to_idle() {
        let guard = RefreshGuard::new();
        let ticket = guard.try_acquire().unwrap();

        drop(ticket);

        assert_eq!(guard.state(), GuardState::Idle);
        assert!(guard.try_acquire().is_some(), "guard can be reacquired");
    }

    #[tokio::test]
    async fn test_wait_idle_returns_immediately_when_idle() {
        let guard = RefreshGuard::new();
        tokio::time::timeout(Duration::from_millis(50), guard.wait_idle())
            .await
            .expect("should not block");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle_blocks_until_ticket_dropped() {
        let guard = Arc::new(RefreshGuard::new());
        let ticket_guard = Arc::clone(&guard);

        let leader = tokio::spawn(async move {
            let _ticket = ticket_guard.try_acquire().expect("first caller leads");
            tokio::time::sleep(Duration::from_secs(2)).await;
        });
        tokio::task::yield_now().await;
        assert_eq!(guard.state(), GuardState::Refreshing);

        let start = tokio::time::Instant::now();
        guard.wait_idle().await;

        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(guard.state(), GuardState::Idle);
        leader.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_leader_releases_guard() {
        let guard = RefreshGuard::new();

        let leader = async {
            let _ticket = guard.try_acquire().unwrap();
            std::future::pending::<()>().await;
        };
        let result = tokio::time::timeout(Duration::from_secs(1), leader).await;

        assert!(result.is_err(), "leader should have been cancelled");
        assert_eq!(guard.state(), GuardState::Idle);
    }
}
