use async_trait::async_trait;
use thiserror::Error;

use super::models::{Movie, NewReview, NewUser, ReviewView, User};
use crate::services::rating::RatingSummary;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique column already holds the value; the payload names the column.
    #[error("Conflict on {0}")]
    Conflict(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Everything the handlers need from persistent storage.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError>;

    async fn email_exists(&self, email: &str) -> Result<bool, DatabaseError>;

    /// Fails with `Conflict("username")` or `Conflict("email")` on a duplicate.
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;

    async fn list_movies(&self) -> Result<Vec<Movie>, DatabaseError>;

    async fn create_movie(&self, title: &str) -> Result<Movie, DatabaseError>;

    async fn list_reviews(&self, movie_id: i64) -> Result<Vec<ReviewView>, DatabaseError>;

    /// Count one review against its movie.
    ///
    /// Reads the movie's current [`RatingSummary`], applies
    /// [`RatingSummary::with_rating`], writes the result back and inserts the
    /// review row, all as one unit scoped to `review.movie_id`: concurrent
    /// calls for the same movie must never read the same `rater_num`.
    /// Returns `NotFound` without writing anything if the movie is absent.
    async fn record_review(&self, review: NewReview) -> Result<RatingSummary, DatabaseError>;
}
