// handlers/protected/reviews.rs - GET /reviews/:id and POST /review/:id

use axum::extract::{Extension, Path, State};
use serde::{Deserialize, Serialize};

use super::parse_movie_id;
use crate::database::ReviewView;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::{RatingSummary, ReviewSubmission};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewReviewRequest {
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewCreated {
    pub success: &'static str,
    #[serde(flatten)]
    pub summary: RatingSummary,
}

/// GET /reviews/:id - Reviews of one movie with their authors, ordered by id
///
/// An unknown movie has no reviews, so it lists as `[]`.
pub async fn list_reviews(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<ReviewView>> {
    let movie_id = parse_movie_id(&id)?;
    let reviews = state.store.list_reviews(movie_id).await?;
    Ok(ApiResponse::success(reviews))
}

/// POST /review/:id - Review a movie as the authenticated user
///
/// The review row and the movie's new average are written together; the
/// response carries the average the caller's review produced.
pub async fn add_review(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<NewReviewRequest>,
) -> ApiResult<ReviewCreated> {
    let movie_id = parse_movie_id(&id)?;

    let summary = state
        .ratings
        .apply_review(ReviewSubmission {
            movie_id,
            user_id: user.id,
            rating: payload.rating,
            comment: payload.comment,
        })
        .await?;

    tracing::info!(
        "User '{}' reviewed movie {}: avg {} over {} ratings",
        user.username,
        movie_id,
        summary.avg_rating,
        summary.rater_num
    );

    Ok(ApiResponse::created(ReviewCreated {
        success: "Review successfully inserted",
        summary,
    }))
}
