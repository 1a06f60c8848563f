use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenService};
use crate::database::Store;
use crate::services::RatingAggregator;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    pub hasher: PasswordHasher,
    pub ratings: RatingAggregator,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, hasher: PasswordHasher) -> Self {
        Self {
            ratings: RatingAggregator::new(store.clone()),
            store,
            tokens: Arc::new(tokens),
            hasher,
        }
    }
}
