pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;

/// Routes without any global layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::public::home::root))
        .route("/health", get(handlers::public::home::health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        .with_state(state)
}

/// [`app`] with the request-logging and CORS layers the configuration enables.
pub fn app_with_config(state: AppState, config: &AppConfig) -> Router {
    let mut router = app(state);
    if config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", get(auth::refresh))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{movies, reviews};

    Router::new()
        .route("/movies", get(movies::list_movies))
        .route("/movie", post(movies::add_movie))
        .route("/reviews/:id", get(reviews::list_reviews))
        .route("/review/:id", post(reviews::add_review))
        .route_layer(from_fn_with_state(state, middleware::require_access))
}
