// handlers/public/home.rs - GET / and GET /health

use axum::extract::State;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub async fn root() -> &'static str {
    "Welcome to movie_rater api"
}

/// Reports whether the store answers a trivial query.
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.store.health_check().await.map_err(|err| {
        tracing::warn!("Health check failed: {}", err);
        ApiError::service_unavailable("Database unavailable")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "database": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
