//! Resolves the caller's bearer credential to a user identity via the
//! external identity endpoint. The endpoint is a black box: it either
//! returns an id for the token or rejects it.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, Result};

#[derive(Deserialize)]
struct IdentityResponse {
    id: String,
}

/// Extracts the token from an `Authorization` header value. Only the
/// `Bearer` scheme is accepted; anything else is rejected rather than
/// forwarded to the identity service as if it were a token.
pub fn bearer_token(header: &str) -> Result<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            AppError::Auth("Authorization header is not a bearer credential".to_string())
        })?
        .trim();
    if token.is_empty() {
        return Err(AppError::Auth("empty bearer credential".to_string()));
    }
    Ok(token)
}

pub async fn resolve_user(client: &Client, config: &Config, token: &str) -> Result<String> {
    let response = client
        .get(&config.identity_url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| AppError::Auth(format!("identity service unreachable: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Auth(format!(
            "credential rejected with status {}",
            response.status().as_u16()
        )));
    }

    let identity: IdentityResponse = response
        .json()
        .await
        .map_err(|e| AppError::Auth(format!("unreadable identity response: {}", e)))?;

    debug!(user_id = %identity.id, "resolved caller identity");
    Ok(identity.id)
}
