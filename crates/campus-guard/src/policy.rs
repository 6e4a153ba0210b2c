//! Route authorization policy.
//!
//! A pure function of the incoming path and the session cookie. Expiry is
//! deliberately not checked here: renewal happens client-side, and
//! rejecting a stale-but-decodable credential would loop redirects while a
//! background renewal is still in flight. Presence and role only.

use campus_auth::claims::{self, Role};

/// Outcome of a route evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(String),
}

/// Path-based authorization policy.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    public_prefixes: Vec<String>,
    role_prefixes: Vec<(String, Role)>,
    login_path: String,
    landing_path: String,
    cookie_name: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            public_prefixes: vec![
                "/".to_string(),
                "/login".to_string(),
                "/register".to_string(),
                "/about".to_string(),
                "/catalog".to_string(),
            ],
            role_prefixes: vec![
                ("/instructor".to_string(), Role::Instructor),
                ("/student".to_string(), Role::Student),
            ],
            login_path: "/login".to_string(),
            landing_path: "/dashboard".to_string(),
            cookie_name: "campus_session".to_string(),
        }
    }
}

impl RoutePolicy {
    /// Create a policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a public path prefix.
    pub fn with_public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefixes.push(prefix.into());
        self
    }

    /// Add a role-scoped path prefix.
    pub fn with_role_prefix(mut self, prefix: impl Into<String>, role: Role) -> Self {
        self.role_prefixes.push((prefix.into(), role));
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

    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Decide whether `path` is reachable with the given session cookie.
    ///
    /// Undecodable credentials redirect to login (fail closed); a
    /// decodable credential with the wrong role for a role-scoped area
    /// redirects to the neutral landing path.
    pub fn evaluate(&self, path: &str, credential: Option<&str>) -> RouteDecision {
        if self.is_public(path) {
            return RouteDecision::Allow;
        }

        let Some(credential) = credential else {
            return RouteDecision::Redirect(self.login_path.clone());
        };

        let Ok(decoded) = claims::decode(credential) else {
            return RouteDecision::Redirect(self.login_path.clone());
        };

        if let Some((prefix, required)) = self
            .role_prefixes
            .iter()
            .find(|(prefix, _)| path_matches(path, prefix))
            && decoded.role != *required
        {
            tracing::debug!(path, %prefix, "role mismatch, redirecting to landing");
            return RouteDecision::Redirect(self.landing_path.clone());
        }

        RouteDecision::Allow
    }

    fn is_public(&self, path: &str) -> bool {
        self.public_prefixes
            .iter()
            .any(|prefix| path_matches(path, prefix))
    }
}

/// Prefix match on path-segment boundaries. The root prefix matches only
/// itself, otherwise every path would be public.
fn path_matches(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    path == prefix || path.starts_with(&format!("{}/", prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    fn make_credential(role: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "sub": "u-5",
                "email": "barbara@campus.dev",
                "username": "barbara",
                "role": role,
                "exp": 2_000_000_000,
            })
            .to_string(),
        );
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_public_paths_allow_without_credential() {
        let policy = RoutePolicy::default();
        assert_eq!(policy.evaluate("/", None), RouteDecision::Allow);
        assert_eq!(policy.evaluate("/login", None), RouteDecision::Allow);
        assert_eq!(policy.evaluate("/catalog/rust-101", None), RouteDecision::Allow);
    }

    #[test]
    fn test_root_prefix_does_not_swallow_everything() {
        let policy = RoutePolicy::default();
        assert_eq!(
            policy.evaluate("/dashboard", None),
            RouteDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_protected_path_without_credential_redirects_to_login() {
        let policy = RoutePolicy::default();
        assert_eq!(
            policy.evaluate("/courses/42", None),
            RouteDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_undecodable_credential_fails_closed() {
        let policy = RoutePolicy::default();
        assert_eq!(
            policy.evaluate("/courses/42", Some("garbage")),
            RouteDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_role_mismatch_redirects_to_landing() {
        let policy = RoutePolicy::default();
        let student = make_credential("student");
        assert_eq!(
            policy.evaluate("/instructor/gradebook", Some(&student)),
            RouteDecision::Redirect("/dashboard".to_string())
        );
    }

    #[test]
    fn test_matching_role_allows() {
        let policy = RoutePolicy::default();
        let instructor = make_credential("instructor");
        assert_eq!(
            policy.evaluate("/instructor/gradebook", Some(&instructor)),
            RouteDecision::Allow
        );
    }

    #[test]
    fn test_authenticated_unscoped_path_allows_any_role() {
        let policy = RoutePolicy::default();
        let student = make_credential("student");
        assert_eq!(policy.evaluate("/courses/42", Some(&student)), RouteDecision::Allow);
    }

    #[test]
    fn test_prefix_requires_segment_boundary() {
        let policy = RoutePolicy::default();
        let student = make_credential("student");
        // "/instructors" is not inside the "/instructor" area.
        assert_eq!(
            policy.evaluate("/instructors", Some(&student)),
            RouteDecision::Allow
        );
    }

    #[test]
    fn test_expired_credential_is_not_rejected_here() {
        // Freshness is the renewal coordinator's concern; the guard only
        // gates on presence and role.
        let policy = RoutePolicy::default();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "sub": "u-5",
                "email": "barbara@campus.dev",
                "username": "barbara",
                "role": "student",
                "exp": 1_000,
            })
            .to_string(),
        );
        let expired = format!("{}.{}.signature", header, payload);
        assert_eq!(policy.evaluate("/courses/42", Some(&expired)), RouteDecision::Allow);
    }

    #[test]
    fn test_builder_customization() {
        let policy = RoutePolicy::new()
            .with_public_prefix("/help")
            .with_login_path("/signin");
        assert_eq!(policy.evaluate("/help/faq", None), RouteDecision::Allow);
        assert_eq!(
            policy.evaluate("/courses", None),
            RouteDecision::Redirect("/signin".to_string())
        );
    }
}
