//! Shared types used by the hosted-service client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while interacting with the hosted data/auth service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service responded with an unexpected status code.
    #[error("Unexpected backend response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A write that should echo the affected row returned nothing.
    #[error("Backend returned no rows for {table}")]
    EmptyResponse {
        /// Table targeted by the write.
        table: String,
    },
}

impl BackendError {
    /// Whether the service rejected the caller's credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedStatus { status, .. }
                if *status == StatusCode::BAD_REQUEST
                    || *status == StatusCode::UNAUTHORIZED
                    || *status == StatusCode::FORBIDDEN
        )
    }
}

/// Identity of an authenticated user as reported by the auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Stable user identifier (owner reference on catalog rows).
    pub id: String,
    /// Email address, when the account has one.
    #[serde(default)]
    pub email: Option<String>,
}

/// Token bundle returned by a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for subsequent requests.
    pub access_token: String,
    /// Token used to obtain a fresh access token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Signed-in user.
    pub user: AuthUser,
}
