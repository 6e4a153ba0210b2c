//! Auth API.

use campus_auth::Identity;

use crate::client::CampusClient;
use crate::error::Result;
use crate::types::{LoginRequest, LoginResponse};

/// Auth API client.
pub struct AuthApi {
    client: CampusClient,
}

impl AuthApi {
    pub(crate) fn new(client: CampusClient) -> Self {
        Self { client }
    }

    /// Authenticate against the server and establish the client session.
    ///
    /// The identity comes from the issued credential's claims, not from the
    /// profile copy in the response.
    pub async fn login(&self, request: LoginRequest) -> Result<Identity> {
        let response: LoginResponse = self.client.post("auth/login", &request).await?;
        let identity = self
            .client
            .session()
            .identity()
            .login(&response.access_token, &response.refresh_token)?;
        Ok(identity)
    }

    /// End the session client-side. No network call; idempotent.
    pub fn logout(&self) {
        self.client.session().identity().logout();
    }
}
