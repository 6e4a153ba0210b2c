//! Session and credential lifecycle core for the Campus platform.
//!
//! Keeps a short-lived access credential and a longer-lived renewal
//! credential synchronized across concurrent network operations, decides
//! when a credential is stale, coordinates a single renewal across many
//! simultaneous callers, and exposes the current authenticated identity.
//!
//! # Components
//!
//! - [`store`] — credential persistence over a key-value sink and a cookie sink
//! - [`claims`] — claim decoding (no signature verification) and skew-tolerant validity
//! - [`renewal`] — single-flight renewal state machine and transport
//! - [`identity`] — session identity derived from the stored credential
//! - [`events`] — session-expired notices for the surrounding UI
//! - [`session`] — one wired handle over all of the above

pub mod claims;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod renewal;
pub mod session;
pub mod store;

pub use claims::{Claims, Role};
pub use config::AuthConfig;
pub use error::{AuthError, RenewalError, Result};
pub use events::{SessionEvents, SessionNotice};
pub use identity::{Identity, IdentityCell, SessionIdentity, SessionState};
pub use renewal::{
    HttpRenewalTransport, RenewalCoordinator, RenewalResult, RenewalTransport, RenewedCredentials,
};
pub use session::SessionCore;
pub use store::{
    Cookie, CookieSink, CredentialStore, FileKeyValueStore, KeyValueStore, MemoryCookieJar,
    MemoryKeyValueStore, StoredCredentials,
};
