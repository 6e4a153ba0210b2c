//! Session identity derived from the stored access credential.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::claims::{self, Claims, Role};
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::renewal::RenewalCoordinator;
use crate::store::CredentialStore;

/// The current authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// Session resolution state.
///
/// `Loading` until the store has been read and validity checked; `Ready`
/// afterwards, holding either a concrete user or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Ready(Option<Identity>),
}

/// Shared identity slot.
///
/// Both [`SessionIdentity`] and the renewal coordinator write here, which
/// keeps identity in sync with renewal outcomes without a dependency cycle
/// between the two.
#[derive(Debug, Clone)]
pub struct IdentityCell {
    state: Arc<RwLock<SessionState>>,
}

impl IdentityCell {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::Loading)),
        }
    }

    pub(crate) fn set(&self, identity: Identity) {
        *self.state.write() = SessionState::Ready(Some(identity));
    }

    pub(crate) fn clear(&self) {
        *self.state.write() = SessionState::Ready(None);
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn current(&self) -> Option<Identity> {
        match &*self.state.read() {
            SessionState::Ready(identity) => identity.clone(),
            SessionState::Loading => None,
        }
    }
}

impl Default for IdentityCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Derives and owns the current authenticated identity.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    config: AuthConfig,
    store: Arc<CredentialStore>,
    renewal: Arc<RenewalCoordinator>,
    cell: IdentityCell,
}

impl SessionIdentity {
    pub fn new(
        config: AuthConfig,
        store: Arc<CredentialStore>,
        renewal: Arc<RenewalCoordinator>,
        cell: IdentityCell,
    ) -> Self {
        Self {
            config,
            store,
            renewal,
            cell,
        }
    }

    /// Resolve the session from the store at startup.
    ///
    /// A valid access credential resolves directly. A missing or stale
    /// access credential with a renewal credential present triggers one
    /// renewal attempt — never a decode of a missing credential. Anything
    /// else resolves to no identity.
    pub async fn initialize(&self) -> Option<Identity> {
        let stored = match self.store.read() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(%err, "failed to read credential store at startup");
                self.cell.clear();
                return None;
            }
        };

        if let Some(access) = &stored.access
            && claims::is_valid(access, self.config.clock_skew)
            && let Ok(decoded) = claims::decode(access)
        {
            let identity = Identity::from(decoded);
            self.cell.set(identity.clone());
            return Some(identity);
        }

        if stored.renewal.is_some() {
            match self.renewal.ensure_fresh().await {
                // The coordinator has already recomputed the identity.
                Ok(_) => return self.cell.current(),
                Err(err) => {
                    tracing::debug!(%err, "startup renewal failed");
                    self.cell.clear();
                    return None;
                }
            }
        }

        // A stale or undecodable access credential with no renewal path
        // out is dead weight.
        if stored.access.is_some()
            && let Err(err) = self.store.clear()
        {
            tracing::warn!(%err, "failed to clear unusable credentials");
        }
        self.cell.clear();
        None
    }

    /// Establish a session from a freshly issued credential pair.
    ///
    /// Rejects a credential whose expiry is already in the past — a token
    /// issued expired indicates clock skew or an issuer bug — leaving the
    /// store untouched.
    pub fn login(&self, access: &str, renewal: &str) -> Result<Identity> {
        let decoded = claims::decode(access)?;
        if decoded.exp <= claims::now_secs() {
            return Err(AuthError::ExpiredOnArrival);
        }

        self.store.save(access, renewal)?;
        self.store.set_role_hint(decoded.role)?;

        let identity = Identity::from(decoded);
        self.cell.set(identity.clone());
        tracing::info!(user = %identity.username, "logged in");
        Ok(identity)
    }

    /// End the session client-side. Idempotent; no network call.
    pub fn logout(&self) {
        if let Err(err) = self.store.clear() {
            tracing::warn!(%err, "failed to clear credential store during logout");
        }
        self.cell.clear();
        tracing::info!("logged out");
    }

    pub fn current(&self) -> Option<Identity> {
        self.cell.current()
    }

    pub fn state(&self) -> SessionState {
        self.cell.state()
    }
}
