//! Single-flight credential renewal.
//!
//! Many independent call sites can discover an expired access credential
//! in the same instant. This module guarantees that at most one renewal
//! network call is ever in flight: the first caller becomes the leader,
//! later callers enqueue as waiters, and the leader's outcome is fanned
//! out to everyone once the call settles.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::claims;
use crate::config::AuthConfig;
use crate::error::RenewalError;
use crate::events::{SessionEvents, SessionNotice};
use crate::identity::{Identity, IdentityCell};
use crate::store::CredentialStore;

/// Outcome of a renewal: the current access credential, or the shared
/// failure.
pub type RenewalResult = std::result::Result<String, RenewalError>;

/// Credentials returned by the renewal endpoint.
///
/// `refresh_token` is present only when the server rotates the renewal
/// credential.
#[derive(Debug, Clone, Deserialize)]
pub struct RenewedCredentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Seam for the renewal network call.
#[async_trait]
pub trait RenewalTransport: Send + Sync + fmt::Debug {
    async fn renew(
        &self,
        renewal_credential: &str,
    ) -> std::result::Result<RenewedCredentials, RenewalError>;
}

#[derive(Debug, Serialize)]
struct RenewalRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

/// Production transport: a bare `reqwest` POST to the renewal endpoint.
///
/// Deliberately not routed through the request gateway — the gateway's
/// 401-triggers-renewal logic must never see the renewal call itself.
#[derive(Debug)]
pub struct HttpRenewalTransport {
    http: reqwest::Client,
    refresh_url: String,
}

impl HttpRenewalTransport {
    pub fn new(refresh_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            refresh_url: refresh_url.into(),
        }
    }
}

#[async_trait]
impl RenewalTransport for HttpRenewalTransport {
    async fn renew(
        &self,
        renewal_credential: &str,
    ) -> std::result::Result<RenewedCredentials, RenewalError> {
        let response = self
            .http
            .post(&self.refresh_url)
            .json(&RenewalRequest {
                refresh_token: renewal_credential,
            })
            .send()
            .await
            .map_err(|e| RenewalError::Network(format!("renewal request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RenewalError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RenewalError::Network(format!("failed to parse renewal response: {}", e)))
    }
}

/// Renewal state. The waiter queue lives inside `Renewing` so the flag and
/// the queue mutate together under one lock.
#[derive(Debug)]
enum RenewalState {
    Idle,
    Renewing(Vec<oneshot::Sender<RenewalResult>>),
}

/// Coordinates renewal across concurrent callers.
#[derive(Debug)]
pub struct RenewalCoordinator {
    config: AuthConfig,
    store: Arc<CredentialStore>,
    transport: Arc<dyn RenewalTransport>,
    identity: IdentityCell,
    events: SessionEvents,
    state: Mutex<RenewalState>,
}

impl RenewalCoordinator {
    pub fn new(
        config: AuthConfig,
        store: Arc<CredentialStore>,
        transport: Arc<dyn RenewalTransport>,
        identity: IdentityCell,
        events: SessionEvents,
    ) -> Self {
        Self {
            config,
            store,
            transport,
            identity,
            events,
            state: Mutex::new(RenewalState::Idle),
        }
    }

    /// Obtain a usable access credential, renewing if necessary.
    ///
    /// If a renewal is already in flight, this enqueues and settles with
    /// the in-flight call's outcome instead of starting a second one. All
    /// concurrent callers succeed together or fail together.
    pub async fn ensure_fresh(&self) -> RenewalResult {
        // Check-and-transition is one synchronous block: no suspension
        // point between observing Idle and claiming leadership.
        let waiter = {
            let mut state = self.state.lock();
            match &mut *state {
                RenewalState::Renewing(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                RenewalState::Idle => {
                    *state = RenewalState::Renewing(Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            return match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(RenewalError::Network(
                    "renewal leader dropped before settling".to_string(),
                )),
            };
        }

        let outcome = self.renew_once().await;

        // Back to Idle before any waiter runs: a waiter that immediately
        // re-enters ensure_fresh must find the machine settled, so it only
        // starts a fresh renewal if the credential it was handed is itself
        // already stale.
        let waiters = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, RenewalState::Idle) {
                RenewalState::Renewing(waiters) => waiters,
                RenewalState::Idle => Vec::new(),
            }
        };

        for waiter in waiters {
            // A caller that dropped its receiver no longer wants the result.
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }

    async fn renew_once(&self) -> RenewalResult {
        let outcome = self.try_renew().await;

        if let Err(err) = &outcome {
            tracing::warn!(%err, "renewal failed, forcing logout");
            if let Err(clear_err) = self.store.clear() {
                tracing::warn!(%clear_err, "failed to clear store after renewal failure");
            }
            self.identity.clear();
            self.events.publish(SessionNotice::Expired {
                redirect: self.config.login_redirect(),
            });
        }

        outcome
    }

    async fn try_renew(&self) -> RenewalResult {
        let stored = self.store.read()?;

        // Renewal without a renewal credential is impossible; fail before
        // touching the network.
        let renewal = stored.renewal.ok_or(RenewalError::NoRenewalCredential)?;

        // A caller may have completed a renewal between this leader's
        // enqueue and now; if the access credential is already valid,
        // skip the round trip and distribute it as-is.
        if let Some(access) = &stored.access
            && claims::is_valid(access, self.config.clock_skew)
        {
            tracing::debug!("access credential already fresh, skipping renewal call");
            return Ok(access.clone());
        }

        let renewed = self.transport.renew(&renewal).await?;

        // Honor rotation: a rotated renewal credential that is not stored
        // makes every later renewal fail permanently.
        let next_renewal = renewed
            .refresh_token
            .filter(|token| !token.is_empty())
            .unwrap_or(renewal);

        let decoded = claims::decode(&renewed.access_token)?;

        self.store.save(&renewed.access_token, &next_renewal)?;
        self.store.set_role_hint(decoded.role)?;
        self.identity.set(Identity::from(decoded));

        tracing::info!("access credential renewed");
        Ok(renewed.access_token)
    }
}
