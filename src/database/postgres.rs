use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use super::models::{Movie, NewReview, NewUser, ReviewView, User};
use super::store::{DatabaseError, Store};
use crate::config::DatabaseConfig;
use crate::services::rating::RatingSummary;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}

/// Translate a unique-constraint violation into `Conflict` naming the column.
fn unique_violation(err: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let column = match db_err.constraint() {
                Some(name) if name.contains("email") => "email",
                _ => "username",
            };
            return DatabaseError::Conflict(column);
        }
    }
    DatabaseError::Sqlx(err)
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT id, username, email, password FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password) VALUES ($1, $2, $3)
             RETURNING id, username, email, password",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation)
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, DatabaseError> {
        let movies = sqlx::query_as::<_, Movie>("SELECT id, title, avg_rating, rater_num FROM movies ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    async fn create_movie(&self, title: &str) -> Result<Movie, DatabaseError> {
        let movie = sqlx::query_as::<_, Movie>(
            "INSERT INTO movies (title) VALUES ($1) RETURNING id, title, avg_rating, rater_num",
        )
        .bind(title)
        .fetch_one(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn list_reviews(&self, movie_id: i64) -> Result<Vec<ReviewView>, DatabaseError> {
        let reviews = sqlx::query_as::<_, ReviewView>(
            "SELECT reviews.id, reviews.rating, reviews.comment, users.username
             FROM reviews
             INNER JOIN users ON reviews.user_id = users.id
             WHERE reviews.movie_id = $1
             ORDER BY reviews.id",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn record_review(&self, review: NewReview) -> Result<RatingSummary, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes every review of this movie until commit.
        let current = sqlx::query_as::<_, (f64, i64, i64)>(
            "SELECT avg_rating, rater_num, rating_total FROM movies WHERE id = $1 FOR UPDATE",
        )
        .bind(review.movie_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((avg_rating, rater_num, rating_total)) = current else {
            return Err(DatabaseError::NotFound(format!("movie {}", review.movie_id)));
        };

        let next = RatingSummary {
            avg_rating,
            rater_num,
            rating_total,
        }
        .with_rating(review.rating);

        sqlx::query("UPDATE movies SET avg_rating = $1, rater_num = $2, rating_total = $3 WHERE id = $4")
            .bind(next.avg_rating)
            .bind(next.rater_num)
            .bind(next.rating_total)
            .bind(review.movie_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO reviews (rating, comment, movie_id, user_id) VALUES ($1, $2, $3, $4)")
            .bind(review.rating)
            .bind(&review.comment)
            .bind(review.movie_id)
            .bind(review.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(next)
    }
}
