//! Route guard middleware.
//!
//! Runs once per incoming page request. Reads the session cookie — the
//! only credential surface visible at this layer — and redirects
//! unauthenticated requests away from protected paths and mismatched-role
//! requests away from role-scoped paths.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::policy::{RouteDecision, RoutePolicy};

/// Route guard middleware function.
///
/// Install with `axum::middleware::from_fn_with_state` and an
/// `Arc<RoutePolicy>` as state.
pub async fn route_guard(
    State(policy): State<Arc<RoutePolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let credential = session_cookie(request.headers(), policy.cookie_name());

    match policy.evaluate(request.uri().path(), credential.as_deref()) {
        RouteDecision::Allow => next.run(request).await,
        RouteDecision::Redirect(to) => {
            tracing::debug!(path = %request.uri().path(), to = %to, "route guarded");
            Redirect::to(&to).into_response()
        }
    }
}

/// Extract a cookie value from the `Cookie` header.
fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request as HttpRequest, http::StatusCode, middleware, routing::get};
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use tower::ServiceExt;

    fn make_credential(role: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "sub": "u-8",
                "email": "donald@campus.dev",
                "username": "donald",
                "role": role,
                "exp": 2_000_000_000,
            })
            .to_string(),
        );
        format!("{}.{}.signature", header, payload)
    }

    async fn page() -> &'static str {
        "page"
    }

    fn guarded_router() -> Router {
        let policy = Arc::new(RoutePolicy::default());
        Router::new()
            .route("/login", get(page))
            .route("/courses/{id}", get(page))
            .route("/instructor/gradebook", get(page))
            .layer(middleware::from_fn_with_state(policy, route_guard))
    }

    fn request(path: &str, cookie: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header("Cookie", cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_public_path_passes_without_cookie() {
        let response = guarded_router()
            .oneshot(request("/login", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_path_without_cookie_redirects_to_login() {
        let response = guarded_router()
            .oneshot(request("/courses/42", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn test_undecodable_cookie_redirects_to_login() {
        let response = guarded_router()
            .oneshot(request("/courses/42", Some("campus_session=garbage")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn test_role_mismatch_redirects_to_landing() {
        let cookie = format!("campus_session={}", make_credential("student"));
        let response = guarded_router()
            .oneshot(request("/instructor/gradebook", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
    }

    #[tokio::test]
    async fn test_matching_role_passes() {
        let cookie = format!("campus_session={}", make_credential("instructor"));
        let response = guarded_router()
            .oneshot(request("/instructor/gradebook", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cookie_found_among_others() {
        let cookie = format!(
            "theme=dark; campus_session={}; locale=en",
            make_credential("student")
        );
        let response = guarded_router()
            .oneshot(request("/courses/42", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_session_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "a=1; campus_session=tok; b=2".parse().unwrap());
        assert_eq!(
            session_cookie(&headers, "campus_session").as_deref(),
            Some("tok")
        );
        assert!(session_cookie(&headers, "absent").is_none());

        let empty = HeaderMap::new();
        assert!(session_cookie(&empty, "campus_session").is_none());
    }
}
