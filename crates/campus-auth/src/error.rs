//! Error types for the session core.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors from credential decoding, validation, and storage.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Credential is structurally malformed. Callers treat this
    /// identically to "no credential".
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Login was attempted with a credential whose expiry is already in
    /// the past. The store is left untouched.
    #[error("Credential expired on arrival")]
    ExpiredOnArrival,

    /// Persistent store read/write failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors from the renewal state machine.
///
/// `Clone` so a single settled renewal outcome can be fanned out to every
/// queued waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenewalError {
    /// No renewal credential in the store; renewal is impossible.
    #[error("No renewal credential available")]
    NoRenewalCredential,

    /// The server refused the renewal credential.
    #[error("Renewal rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Transport failure during the renewal call.
    #[error("Network error during renewal: {0}")]
    Network(String),

    /// The freshly issued access credential failed to decode.
    #[error("Renewed credential is invalid: {0}")]
    InvalidCredential(String),

    /// Persistent store read/write failed mid-renewal.
    #[error("Storage error during renewal: {0}")]
    Storage(String),
}

impl From<AuthError> for RenewalError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredential(msg) => RenewalError::InvalidCredential(msg),
            other => RenewalError::Storage(other.to_string()),
        }
    }
}
