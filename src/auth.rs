use std::time::Duration;

use axum::http::{header, HeaderMap};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;

/// Identity established by the external auth provider for one request.
pub struct AuthUser {
    pub id: Uuid,
    #[allow(dead_code)]
    pub email: Option<String>,
}

/// Verifies bearer tokens against the Supabase auth API. Read-only; this
/// service never creates or mutates accounts.
pub struct AuthClient {
    http: reqwest::Client,
    user_url: String,
    anon_key: String,
    timeout: Duration,
}

impl AuthClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        AuthClient {
            http,
            user_url: format!("{}/auth/v1/user", config.supabase_url.trim_end_matches('/')),
            anon_key: config.supabase_key.clone(),
            timeout: config.auth_timeout,
        }
    }

    /// Validates the `Authorization: Bearer <token>` header by forwarding the
    /// token to the provider's user-lookup endpoint. Must be the first call
    /// in every authenticated handler.
    pub async fn verify(&self, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
        let token = extract_bearer_token(headers)?;

        let response = self
            .http
            .get(&self.user_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header("apikey", &self.anon_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::UpstreamUnavailable(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            log::debug!("auth rejected token: {}", response.status());
            return Err(ApiError::Unauthenticated("Invalid or expired token"));
        }

        let user_data: serde_json::Value = response
            .json()
            .await
            .map_err(|_| ApiError::Unauthenticated("Invalid user data format"))?;
        if !user_data.is_object() {
            return Err(ApiError::Unauthenticated("Invalid user data format"));
        }

        let id = user_data
            .get("id")
            .and_then(|id| id.as_str())
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(ApiError::Unauthenticated("User ID not found in token"))?;

        let email = user_data
            .get("email")
            .and_then(|email| email.as_str())
            .map(String::from);

        Ok(AuthUser { id, email })
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`. Rejected
/// credentials fail here, before any network call is made.
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthenticated("Missing Authorization header"))?;

    let token = authorization
        .strip_prefix("Bearer ")
        .unwrap_or(authorization)
        .trim();
    if token.is_empty() {
        return Err(ApiError::Unauthenticated("Invalid token format"));
    }

    Ok(token)
}
