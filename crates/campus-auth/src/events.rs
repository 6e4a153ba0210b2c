//! Session lifecycle notifications.
//!
//! Forced logouts must never be silent: every one publishes a notice
//! carrying the login redirect (with its session-expired indicator) so the
//! surrounding UI can explain why the user was signed out.

use std::sync::Arc;

use tokio::sync::watch;

/// A session lifecycle notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The session ended without a user-initiated logout. `redirect` is the
    /// login entry point carrying the session-expired query indicator.
    Expired { redirect: String },
}

/// Broadcast handle for session notices.
///
/// Cheap to clone; all clones share one channel. The latest notice is
/// retained so a subscriber attached after the fact still observes it.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: Arc<watch::Sender<Option<SessionNotice>>>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a notice, replacing any previous one.
    pub fn publish(&self, notice: SessionNotice) {
        tracing::warn!(?notice, "session notice published");
        self.tx.send_replace(Some(notice));
    }

    /// Subscribe to notices.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionNotice>> {
        self.tx.subscribe()
    }

    /// The most recent notice, if any.
    pub fn latest(&self) -> Option<SessionNotice> {
        self.tx.borrow().clone()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
