// handlers/public/auth/login.rs - POST /login handler

use axum::extract::State;
use serde::Deserialize;

use super::utils::SessionResponse;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /login - Exchange email and password for a token pair
///
/// Unknown email and wrong password both answer `401 Bad credentials`.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<SessionResponse> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Empty email or password"));
    }

    let Some(user) = state.store.find_user_by_email(&payload.email).await? else {
        tracing::warn!("Login failed, no account for the given email");
        return Err(ApiError::bad_credentials());
    };

    let matches = state
        .hasher
        .verify_blocking(payload.password, user.password_hash.clone())
        .await;
    if !matches {
        tracing::warn!("Login failed for user '{}': wrong password", user.username);
        return Err(ApiError::bad_credentials());
    }

    let tokens = state.tokens.issue_pair(&user.subject())?;
    tracing::info!("User '{}' logged in", user.username);

    Ok(ApiResponse::success(SessionResponse::new(tokens, user)))
}
