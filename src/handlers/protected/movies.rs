// handlers/protected/movies.rs - GET /movies and POST /movie

use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::MovieView;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// In bytes.
pub const MIN_TITLE_LEN: usize = 3;

#[derive(Debug, Deserialize)]
pub struct NewMovieRequest {
    #[serde(default)]
    pub title: String,
}

/// GET /movies - Every movie with its current average, ordered by id
pub async fn list_movies(State(state): State<AppState>) -> ApiResult<Vec<MovieView>> {
    let movies = state.store.list_movies().await?;
    Ok(ApiResponse::success(movies.into_iter().map(MovieView::from).collect()))
}

/// POST /movie - Add a movie with no ratings yet
pub async fn add_movie(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<NewMovieRequest>,
) -> ApiResult<Value> {
    if payload.title.len() < MIN_TITLE_LEN {
        return Err(ApiError::bad_request(
            "Movie title too short (must be at least 3 characters)",
        ));
    }

    let movie = state.store.create_movie(&payload.title).await?;
    tracing::info!("User '{}' added movie {} '{}'", user.username, movie.id, movie.title);

    Ok(ApiResponse::created(json!({ "success": "Movie successfully inserted" })))
}
