// handlers/public/auth/register.rs - POST /register handler

use axum::extract::State;
use serde::Deserialize;

use super::utils::{validate_email, validate_password, validate_username, SessionResponse};
use crate::database::NewUser;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, alias = "user")]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /register - Create an account and open a session
///
/// Expected Input:
/// ```json
/// { "username": "alice123", "email": "alice@example.com", "password": "secretpw" }
/// ```
///
/// Checks run in order (email, password, username, uniqueness) and the first
/// failure is returned. Nothing is written unless every check passes.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<SessionResponse> {
    validate_email(&payload.email).map_err(ApiError::bad_request)?;
    validate_password(&payload.password).map_err(ApiError::bad_request)?;
    validate_username(&payload.username).map_err(ApiError::bad_request)?;

    if state.store.username_exists(&payload.username).await? {
        tracing::warn!("Registration refused, username '{}' taken", payload.username);
        return Err(ApiError::conflict("Username already exist"));
    }
    if state.store.email_exists(&payload.email).await? {
        tracing::warn!("Registration refused, email already in use");
        return Err(ApiError::conflict("Email has been used"));
    }

    let password_hash = state.hasher.hash_blocking(payload.password).await?;

    // A concurrent registration can still win the race; the unique
    // constraints turn that into the same 409 through DatabaseError::Conflict.
    let user = state
        .store
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            password_hash,
        })
        .await?;

    let tokens = state.tokens.issue_pair(&user.subject())?;
    tracing::info!("Registered user '{}' (id {})", user.username, user.id);

    Ok(ApiResponse::success(SessionResponse::new(tokens, user)))
}
