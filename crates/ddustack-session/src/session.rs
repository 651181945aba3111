//! Session types: the in-memory record of who is signed in.
//!
//! A "session" is the client's view of its own authentication. It tracks:
//! - WHAT bearer token to attach (`access_token`)
//! - WHO the token belongs to (`user`)
//! - WHETHER startup recovery is still running (`is_initializing`)
//!
//! Nothing here is ever written to disk. Continuity across restarts comes
//! from the HTTP client's cookie jar and a fresh `bootstrap()`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ddustack_protocol::UserProfile;
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// GatekeeperConfig
// ---------------------------------------------------------------------------

/// Tunables for the [`Gatekeeper`](crate::Gatekeeper).
#[derive(Debug, Clone)]
pub struct GatekeeperConfig {
    /// Client-side deadline for the OAuth code exchange plus profile fetch.
    ///
    /// Default: 10 seconds.
    pub oauth_timeout: Duration,

    /// Refresh before sending when the stored token is a JWT whose `exp`
    /// has already passed, instead of waiting for the 401.
    ///
    /// Default: `true`. Opaque tokens always take the 401 path.
    pub proactive_refresh: bool,

    /// A JWT that expires within this window counts as expired.
    ///
    /// Default: 5 seconds.
    pub expiry_leeway: Duration,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            oauth_timeout: Duration::from_secs(10),
            proactive_refresh: true,
            expiry_leeway: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A consistent snapshot of the session.
///
/// ```text
///   initializing ──(bootstrap ok)──→ authenticated
///        │                                │
///        └──(bootstrap failed)──→ anonymous ←──(logout / refresh failed)
/// ```
///
/// UI code reads snapshots; only the gatekeeper writes.
#[derive(Clone, PartialEq)]
pub struct Session {
    /// Short-lived bearer credential, `None` when signed out.
    pub access_token: Option<String>,

    /// Profile of the signed-in user. Its presence is the authorization
    /// signal the views react to.
    pub user: Option<UserProfile>,

    /// `true` from process start until the first bootstrap settles.
    /// Protected views render a neutral loading state meanwhile.
    pub is_initializing: bool,
}

impl Session {
    /// The state at process start: empty and initializing.
    pub fn initializing() -> Self {
        Self {
            access_token: None,
            user: None,
            is_initializing: true,
        }
    }

    /// Both a token and a profile are present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }

    /// Neither a token nor a profile is present.
    pub fn is_anonymous(&self) -> bool {
        self.access_token.is_none() && self.user.is_none()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initializing()
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user.as_ref().map(|u| &u.id))
            .field("is_initializing", &self.is_initializing)
            .finish()
    }
}

/// What `bootstrap()` ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    /// A session was recovered from the refresh cookie.
    Authenticated(UserProfile),
    /// No session could be recovered; the user has to sign in.
    Anonymous,
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// The single piece of mutable shared state.
///
/// Backed by a `watch` channel so every write is one atomic replacement,
/// readers always see a whole [`Session`], and views can
/// [`subscribe`](Self::subscribe) to re-render on change.
///
/// Mutators are `pub(crate)`: only the gatekeeper writes.
///
/// Every sign-out bumps a generation counter. A refresh started before the
/// sign-out cannot write its token back afterwards
/// (see [`set_access_token_if`](Self::set_access_token_if)).
#[derive(Debug)]
pub struct SessionStore {
    state: watch::Sender<Session>,
    // Only touched while the watch lock is held.
    generation: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Session::initializing());
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Returns a copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receives every future change to the session.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    /// How many times the session has been cleared or reset.
    pub fn generation(&self) -> u64 {
        let _lock = self.state.borrow();
        self.generation.load(Ordering::Relaxed)
    }

    /// Stores `token` only if nobody cleared the session since `generation`
    /// was read. Returns whether it was stored.
    pub(crate) fn set_access_token_if(&self, generation: u64, token: String) -> bool {
        self.state.send_if_modified(|s| {
            if self.generation.load(Ordering::Relaxed) != generation {
                return false;
            }
            s.access_token = Some(token);
            true
        })
    }

    pub(crate) fn set_user(&self, user: UserProfile) {
        self.state.send_modify(|s| s.user = Some(user));
    }

    /// Points the signed-in user's avatar at `url`. No-op when signed out.
    pub(crate) fn set_avatar(&self, url: String) {
        self.state.send_if_modified(|s| match &mut s.user {
            Some(user) => {
                user.avatar = Some(url);
                true
            }
            None => false,
        });
    }

    pub(crate) fn set_credentials(&self, token: String, user: UserProfile) {
        self.state.send_modify(|s| {
            s.access_token = Some(token);
            s.user = Some(user);
        });
    }

    /// Drops token and profile together and ends initialization.
    pub(crate) fn clear(&self) {
        self.state.send_modify(|s| {
            self.generation.fetch_add(1, Ordering::Relaxed);
            s.access_token = None;
            s.user = None;
            s.is_initializing = false;
        });
    }

    /// Flips `is_initializing` to `false`. Returns `true` only for the call
    /// that actually flipped it.
    pub(crate) fn finish_initializing(&self) -> bool {
        self.state.send_if_modified(|s| {
            if s.is_initializing {
                s.is_initializing = false;
                true
            } else {
                false
            }
        })
    }

    /// Clears the session and re-enters the initializing state.
    pub(crate) fn restart_initializing(&self) {
        self.state.send_modify(|s| {
            self.generation.fetch_add(1, Ordering::Relaxed);
            *s = Session::initializing();
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use ddustack_protocol::{Role, UserId};

    use super::*;

    fn user() -> UserProfile {
        UserProfile {
            id: UserId("u-1".into()),
            username: None,
            first_name: "Hana".into(),
            last_name: "Tesfaye".into(),
            email: Some("hana@ddu.edu.et".into()),
            avatar: None,
            metadata: None,
            provider: None,
            provider_id: None,
            role: Role::Lecturer,
            user_id: None,
            is_active: true,
            is_verified: true,
            department: None,
            year: None,
            semester: None,
            date_joined: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_new_store_is_initializing_and_empty() {
        let store = SessionStore::new();
        let s = store.snapshot();

        assert!(s.is_initializing);
        assert!(s.is_anonymous());
        assert!(!s.is_authenticated());
    }

    #[test]
    fn test_set_credentials_sets_token_and_user_together() {
        let store = SessionStore::new();
        store.set_credentials("T1".into(), user());

        let s = store.snapshot();
        assert_eq!(s.access_token.as_deref(), Some("T1"));
        assert_eq!(s.user, Some(user()));
        assert!(s.is_authenticated());
    }

    #[test]
    fn test_clear_empties_session_and_ends_initializing() {
        let store = SessionStore::new();
        store.set_credentials("T1".into(), user());

        store.clear();

        let s = store.snapshot();
        assert!(s.is_anonymous());
        assert!(!s.is_initializing);
    }

    #[test]
    fn test_finish_initializing_flips_only_once() {
        let store = SessionStore::new();

        assert!(store.finish_initializing());
        assert!(!store.finish_initializing());
        assert!(!store.snapshot().is_initializing);
    }

    #[test]
    fn test_restart_initializing_resets_everything() {
        let store = SessionStore::new();
        store.set_credentials("T1".into(), user());
        store.finish_initializing();

        store.restart_initializing();

        assert_eq!(store.snapshot(), Session::initializing());
    }

    #[test]
    fn test_set_access_token_if_drops_token_after_clear() {
        let store = SessionStore::new();
        let generation = store.generation();

        store.clear();

        assert!(!store.set_access_token_if(generation, "R1".into()));
        assert!(store.snapshot().is_anonymous());
    }

    #[test]
    fn test_set_access_token_if_stores_when_generation_matches() {
        let store = SessionStore::new();
        store.set_credentials("T1".into(), user());
        let generation = store.generation();

        assert!(store.set_access_token_if(generation, "R1".into()));
        assert_eq!(store.access_token().as_deref(), Some("R1"));
    }

    #[test]
    fn test_set_avatar_ignored_when_signed_out() {
        let store = SessionStore::new();
        store.set_avatar("/media/a.png".into());
        assert!(store.user().is_none());

        store.set_credentials("T1".into(), user());
        store.set_avatar("/media/a.png".into());
        assert_eq!(store.user().and_then(|u| u.avatar).as_deref(), Some("/media/a.png"));
    }

    #[test]
    fn test_restart_initializing_bumps_generation() {
        let store = SessionStore::new();
        let before = store.generation();

        store.restart_initializing();

        assert_eq!(store.generation(), before + 1);
    }

    #[tokio::test]
    async fn test_subscriber_sees_change() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.set_access_token_if(store.generation(), "T9".into());

        rx.changed().await.expect("store is alive");
        assert_eq!(rx.borrow().access_token.as_deref(), Some("T9"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let store = SessionStore::new();
        store.set_access_token_if(store.generation(), "eyJsecret".into());

        let printed = format!("{:?}", store.snapshot());
        assert!(!printed.contains("eyJsecret"));
    }
}
