// handlers/protected/mod.rs - Protected handlers (access token required)
//
// Mounted behind middleware::require_access, so every handler here can take
// Extension<AuthUser> and trust it.
pub mod movies;
pub mod reviews;

use crate::error::ApiError;

/// Parse the `:id` path segment of the review routes.
pub(crate) fn parse_movie_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::bad_request("Invalid movie id"))
}
