// handlers/public/auth/refresh.rs - GET /refresh handler

use axum::extract::State;

use crate::auth::TokenPair;
use crate::middleware::{ApiResponse, ApiResult, BearerToken};
use crate::state::AppState;

/// GET /refresh - Trade a refresh token (bearer) for a fresh access/refresh pair
///
/// The presented refresh token stays valid until its own expiry.
pub async fn refresh(State(state): State<AppState>, BearerToken(token): BearerToken) -> ApiResult<TokenPair> {
    let tokens = state.tokens.refresh(&token)?;
    Ok(ApiResponse::success(tokens))
}
