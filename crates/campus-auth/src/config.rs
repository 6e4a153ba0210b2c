//! Configuration for the session core.

use std::time::Duration;

use url::Url;

/// Default clock-skew tolerance when checking credential expiry.
///
/// A credential within this margin of its nominal expiry is still treated
/// as usable, which absorbs drift between the client clock and the issuing
/// server and avoids renewal storms right at the expiry boundary.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Default lifetime of the session cookie.
pub const DEFAULT_COOKIE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for credential storage, renewal, and forced-logout
/// redirects.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Absolute URL of the renewal endpoint.
    pub refresh_url: String,

    /// Clock-skew tolerance applied by validity checks.
    pub clock_skew: Duration,

    /// Name of the cookie mirroring the access credential.
    pub cookie_name: String,

    /// Path scope of the session cookie.
    pub cookie_path: String,

    /// Lifetime of the session cookie.
    pub cookie_max_age: Duration,

    /// Key-value store key for the access credential.
    pub access_key: String,

    /// Key-value store key for the renewal credential.
    pub renewal_key: String,

    /// Key-value store key for the last-known role hint.
    pub role_key: String,

    /// Login entry point for unauthenticated and signed-out users.
    pub login_path: String,

    /// Query indicator appended to the login path on forced logout, so the
    /// login screen can explain why the user was signed out.
    pub expired_query: String,

    /// Neutral landing path for role-mismatched navigation.
    pub landing_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_url: "http://127.0.0.1:8080/auth/refresh".to_string(),
            clock_skew: DEFAULT_CLOCK_SKEW,
            cookie_name: "campus_session".to_string(),
            cookie_path: "/".to_string(),
            cookie_max_age: DEFAULT_COOKIE_MAX_AGE,
            access_key: "campus.access".to_string(),
            renewal_key: "campus.renewal".to_string(),
            role_key: "campus.role".to_string(),
            login_path: "/login".to_string(),
            expired_query: "session=expired".to_string(),
            landing_path: "/dashboard".to_string(),
        }
    }
}

impl AuthConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the renewal endpoint URL.
    pub fn with_refresh_url(mut self, url: impl Into<String>) -> Self {
        self.refresh_url = url.into();
        self
    }

    /// Set the clock-skew tolerance.
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the session cookie lifetime.
    pub fn with_cookie_max_age(mut self, max_age: Duration) -> Self {
        self.cookie_max_age = max_age;
        self
    }

    /// Set the login entry point.
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Set the neutral landing path.
    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.landing_path = path.into();
        self
    }

    /// The forced-logout redirect target, carrying the session-expired
    /// indicator.
    pub fn login_redirect(&self) -> String {
        format!("{}?{}", self.login_path, self.expired_query)
    }

    /// Path component of the renewal endpoint, used by the request gateway
    /// to recognize renewal calls and keep them out of its retry cycle.
    pub fn refresh_path(&self) -> String {
        match Url::parse(&self.refresh_url) {
            Ok(url) => url.path().to_string(),
            Err(_) => {
                let path = self.refresh_url.trim_start_matches('/');
                format!("/{}", path)
            }
        }
    }
}
