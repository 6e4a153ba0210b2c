//! Main gateway implementation.
//!
//! Every outgoing request carries the current access credential; an
//! authorization failure triggers one credential renewal and exactly one
//! retry of the original request. Renewal calls themselves never pass
//! through this interceptor.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use url::Url;

use campus_auth::SessionCore;

use crate::api::AuthApi;
use crate::error::{Error, ErrorResponse, Result};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Campus API gateway.
///
/// All screens send their traffic through this client; it owns credential
/// attachment and the 401 renew-and-retry cycle, so callers only ever see
/// their own domain errors.
///
/// # Example
///
/// ```no_run
/// use campus_auth::{AuthConfig, MemoryCookieJar, MemoryKeyValueStore, SessionCore};
/// use campus_client::CampusClient;
///
/// # async fn example() -> campus_client::Result<()> {
/// let session = SessionCore::with_http_transport(
///     AuthConfig::default(),
///     Box::new(MemoryKeyValueStore::new()),
///     Box::new(MemoryCookieJar::new()),
/// );
///
/// let client = CampusClient::builder()
///     .base_url("http://localhost:8080")
///     .session(session)
///     .build()?;
///
/// let courses: serde_json::Value = client.get("courses").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CampusClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
struct ClientInner {
    /// HTTP client.
    http: reqwest::Client,
    /// Base URL for API requests.
    base_url: Url,
    /// Request timeout.
    timeout: Duration,
    /// Session core: store, renewal coordinator, identity.
    session: SessionCore,
}

impl CampusClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The session core backing this client.
    pub fn session(&self) -> &SessionCore {
        &self.inner.session
    }

    /// Access the auth API.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    /// Make a GET request.
    pub async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .dispatch(Method::GET, path, None::<&()>, None::<&()>)
            .await?;
        self.handle_response(response).await
    }

    /// Make a GET request with query parameters.
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let response = self
            .dispatch(Method::GET, path, None::<&()>, Some(query))
            .await?;
        self.handle_response(response).await
    }

    /// Make a POST request.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self
            .dispatch(Method::POST, path, Some(body), None::<&()>)
            .await?;
        self.handle_response(response).await
    }

    /// Make a PUT request.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self
            .dispatch(Method::PUT, path, Some(body), None::<&()>)
            .await?;
        self.handle_response(response).await
    }

    /// Make a PATCH request.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self
            .dispatch(Method::PATCH, path, Some(body), None::<&()>)
            .await?;
        self.handle_response(response).await
    }

    /// Make a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .dispatch(Method::DELETE, path, None::<&()>, None::<&()>)
            .await?;

        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch with renew-and-retry
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a request, renewing the access credential and retrying exactly
    /// once on an authorization failure.
    async fn dispatch<B, Q>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: Option<&Q>,
    ) -> Result<reqwest::Response>
    where
        B: serde::Serialize + ?Sized,
        Q: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let is_renewal_call = url.path() == self.inner.session.config().refresh_path();
        let mut retried = false;

        loop {
            let mut request = self
                .inner
                .http
                .request(method.clone(), url.clone())
                .timeout(self.inner.timeout);
            if let Some(query) = query {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            // Re-read per attempt: the credential rotates underneath us.
            if let Some(access) = self.access_credential() {
                request = request.bearer_auth(access);
            }

            let response = request.send().await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                if is_renewal_call {
                    // Retrying the renewal call would recurse into renewal.
                    tracing::warn!("renewal endpoint rejected the request, forcing logout");
                    self.inner.session.force_logout();
                    return Err(Error::SessionExpired {
                        redirect: self.inner.session.config().login_redirect(),
                    });
                }

                if retried {
                    return Err(Error::RetryExhausted);
                }

                retried = true;
                tracing::debug!(path, "authorization failure, renewing credential");
                match self.inner.session.coordinator().ensure_fresh().await {
                    Ok(_) => continue,
                    Err(err) => {
                        // The coordinator has already cleared the session
                        // and published the expiry notice.
                        tracing::warn!(%err, "renewal failed during request retry");
                        return Err(Error::SessionExpired {
                            redirect: self.inner.session.config().login_redirect(),
                        });
                    }
                }
            }

            return Ok(response);
        }
    }

    fn access_credential(&self) -> Option<String> {
        match self.inner.session.store().read() {
            Ok(stored) => stored.access,
            Err(err) => {
                tracing::warn!(%err, "failed to read access credential, sending unauthenticated");
                None
            }
        }
    }

    /// Handle a response, extracting the body or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();

        match response.json::<ErrorResponse>().await {
            Ok(err) => {
                if status == 404 {
                    Error::NotFound(err.message)
                } else if status == 401 {
                    Error::Auth(err.message)
                } else {
                    Error::Api {
                        status,
                        code: err.code,
                        message: err.message,
                    }
                }
            }
            Err(_) => Error::Api {
                status,
                code: "unknown".to_string(),
                message: format!("HTTP {}", status),
            },
        }
    }
}

/// Builder for creating a CampusClient.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    session: Option<SessionCore>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            session: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the base URL for the server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the session core.
    pub fn session(mut self, session: SessionCore) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<CampusClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;
        let session = self
            .session
            .ok_or_else(|| Error::Config("session is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("campus-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(CampusClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                session,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
