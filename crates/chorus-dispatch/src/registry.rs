//! Per-session cancellation registry
//!
//! Every dispatch registers under its session id and receives a child token
//! of the session's root token. An external abort cancels the root, which
//! cancels every in-flight provider task for that session atomically.

use chorus_domain::SessionId;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Registry of per-session cancellation roots.
pub struct AbortRegistry {
    sessions: Mutex<HashMap<SessionId, CancellationToken>>,
}

impl AbortRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a dispatch under a session and get its cancellation token.
    ///
    /// The returned token is a child of the session root: cancelling it (for
    /// a per-dispatch deadline) does not affect other dispatches, while an
    /// [`abort`](Self::abort) of the session cancels all of them.
    pub fn register(&self, session: &SessionId) -> CancellationToken {
        let mut sessions = self.sessions.lock().unwrap();
        let root = sessions
            .entry(session.clone())
            .or_insert_with(CancellationToken::new);
        debug!(session = %session, "dispatch registered");
        root.child_token()
    }

    /// Cancel every in-flight dispatch for a session. Returns whether the
    /// session had any registered dispatches.
    pub fn abort(&self, session: &SessionId) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.remove(session) {
            Some(root) => {
                info!(session = %session, "aborting all in-flight provider tasks");
                root.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop a session's root token without cancelling (session ended cleanly).
    pub fn release(&self, session: &SessionId) {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(session);
    }

    /// Number of sessions with registered dispatches.
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

impl Default for AbortRegistry {
    fn default() -> Self {
        Self::new()
    }
}
