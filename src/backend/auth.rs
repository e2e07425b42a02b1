//! Session and identity calls against the hosted auth API.

use reqwest::{Method, StatusCode};
use serde_json::json;

use super::{
    client::BackendClient,
    types::{AuthSession, AuthUser, BackendError},
};

const AUTH_PREFIX: &str = "auth/v1";

impl BackendClient {
    /// Exchange an email/password pair for a session.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let response = self
            .request(Method::POST, &format!("{AUTH_PREFIX}/token"), None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let response = self
            .ensure_success(response, "auth", "Sign-in failed")
            .await?;
        let session: AuthSession = response.json().await?;
        tracing::info!(user_id = %session.user.id, "User signed in");
        Ok(session)
    }

    /// Resolve the user behind an access token; `None` when the token is not accepted.
    pub async fn get_user(&self, token: &str) -> Result<Option<AuthUser>, BackendError> {
        let response = self
            .request(Method::GET, &format!("{AUTH_PREFIX}/user"), Some(token))
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::debug!("Access token rejected by auth API");
                Ok(None)
            }
            _ => {
                let response = self
                    .ensure_success(response, "auth", "User lookup failed")
                    .await?;
                Ok(Some(response.json().await?))
            }
        }
    }

    /// Revoke the session behind `token`.
    pub async fn sign_out(&self, token: &str) -> Result<(), BackendError> {
        let response = self
            .request(Method::POST, &format!("{AUTH_PREFIX}/logout"), Some(token))
            .send()
            .await?;
        self.ensure_success(response, "auth", "Sign-out failed")
            .await?;
        tracing::info!("User signed out");
        Ok(())
    }

    /// Probe the auth API health endpoint.
    pub async fn health(&self) -> Result<(), BackendError> {
        let response = self
            .request(Method::GET, &format!("{AUTH_PREFIX}/health"), None)
            .send()
            .await?;
        self.ensure_success(response, "auth", "Health probe failed")
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };

    fn client_for(server: &MockServer) -> BackendClient {
        BackendClient::from_parts(&server.base_url(), "anon-key").expect("client")
    }

    #[tokio::test]
    async fn sign_in_posts_password_grant() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/v1/token")
                    .query_param("grant_type", "password")
                    .json_body(json!({ "email": "ada@example.org", "password": "secret" }));
                then.status(200).json_body(json!({
                    "access_token": "jwt-123",
                    "token_type": "bearer",
                    "expires_in": 3600,
                    "refresh_token": "refresh-1",
                    "user": { "id": "user-1", "email": "ada@example.org" }
                }));
            })
            .await;

        let session = client_for(&server)
            .sign_in_with_password("ada@example.org", "secret")
            .await
            .expect("sign in");

        mock.assert_async().await;
        assert_eq!(session.access_token, "jwt-123");
        assert_eq!(session.user.id, "user-1");
        assert_eq!(session.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn rejected_credentials_are_auth_failures() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/token");
                then.status(400)
                    .json_body(json!({ "error": "invalid_grant" }));
            })
            .await;

        let err = client_for(&server)
            .sign_in_with_password("ada@example.org", "wrong")
            .await
            .expect_err("sign in should fail");
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn get_user_maps_unauthorized_to_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/auth/v1/user")
                    .header("authorization", "Bearer expired");
                then.status(401);
            })
            .await;

        let user = client_for(&server)
            .get_user("expired")
            .await
            .expect("lookup");
        assert!(user.is_none());
    }
}
