//! HTTP request gateway for the Campus platform.
//!
//! Wraps every outgoing network operation: attaches the current access
//! credential, and on an authorization failure renews the credential once
//! (through the session core's single-flight coordinator) and retries the
//! original request exactly once. Non-auth failures pass through to the
//! calling screen unchanged.
//!
//! # Example
//!
//! ```no_run
//! use campus_auth::{AuthConfig, MemoryCookieJar, MemoryKeyValueStore, SessionCore};
//! use campus_client::{CampusClient, LoginRequest, Result};
//!
//! # async fn example() -> Result<()> {
//! let session = SessionCore::with_http_transport(
//!     AuthConfig::default(),
//!     Box::new(MemoryKeyValueStore::new()),
//!     Box::new(MemoryCookieJar::new()),
//! );
//!
//! let client = CampusClient::builder()
//!     .base_url("http://localhost:8080")
//!     .session(session)
//!     .build()?;
//!
//! let identity = client
//!     .auth()
//!     .login(LoginRequest::new("ada@campus.dev", "secret"))
//!     .await?;
//! println!("Signed in as {}", identity.username);
//!
//! // Screens go through the verb methods; credential attachment and the
//! // renew-and-retry cycle are invisible to them.
//! let courses: serde_json::Value = client.get("courses").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use api::AuthApi;
pub use client::{CampusClient, ClientBuilder};
pub use error::{Error, Result};
pub use types::{LoginRequest, LoginResponse, UserProfile};
