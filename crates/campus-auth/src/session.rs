//! Wiring for the session core.

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::events::{SessionEvents, SessionNotice};
use crate::identity::{IdentityCell, SessionIdentity};
use crate::renewal::{HttpRenewalTransport, RenewalCoordinator, RenewalTransport};
use crate::store::{CookieSink, CredentialStore, KeyValueStore};

/// One handle over the whole session core, shared across async contexts.
///
/// Owns the store, the renewal coordinator, the session identity, and the
/// notice channel, wired so that a renewal outcome is reflected in all of
/// them. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionCore {
    config: AuthConfig,
    store: Arc<CredentialStore>,
    coordinator: Arc<RenewalCoordinator>,
    identity: SessionIdentity,
    events: SessionEvents,
}

impl SessionCore {
    /// Wire a session core over the given sinks and renewal transport.
    pub fn new(
        config: AuthConfig,
        kv: Box<dyn KeyValueStore>,
        cookies: Box<dyn CookieSink>,
        transport: Arc<dyn RenewalTransport>,
    ) -> Self {
        let store = Arc::new(CredentialStore::new(config.clone(), kv, cookies));
        let cell = IdentityCell::new();
        let events = SessionEvents::new();
        let coordinator = Arc::new(RenewalCoordinator::new(
            config.clone(),
            store.clone(),
            transport,
            cell.clone(),
            events.clone(),
        ));
        let identity = SessionIdentity::new(
            config.clone(),
            store.clone(),
            coordinator.clone(),
            cell,
        );

        Self {
            config,
            store,
            coordinator,
            identity,
            events,
        }
    }

    /// Wire a session core with the production HTTP renewal transport.
    pub fn with_http_transport(
        config: AuthConfig,
        kv: Box<dyn KeyValueStore>,
        cookies: Box<dyn CookieSink>,
    ) -> Self {
        let transport = Arc::new(HttpRenewalTransport::new(config.refresh_url.clone()));
        Self::new(config, kv, cookies, transport)
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RenewalCoordinator> {
        &self.coordinator
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// End the session without user intent and say why.
    ///
    /// Used when an authorization failure cannot be recovered by renewal
    /// (for example, the renewal call itself was rejected at the gateway).
    pub fn force_logout(&self) {
        self.identity.logout();
        self.events.publish(SessionNotice::Expired {
            redirect: self.config.login_redirect(),
        });
    }
}
