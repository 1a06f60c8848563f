use serde::Serialize;
use sqlx::FromRow;

use crate::auth::Subject;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

impl User {
    pub fn subject(&self) -> Subject {
        Subject {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub avg_rating: f64,
    pub rater_num: i64,
}

/// Public shape of a movie in listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieView {
    pub id: i64,
    pub title: String,
    pub avg_rating: f64,
}

impl From<Movie> for MovieView {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            avg_rating: movie.avg_rating,
        }
    }
}

/// A review joined with its author's username.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewView {
    pub id: i64,
    pub rating: i32,
    pub comment: String,
    pub username: String,
}

/// A validated review ready to be counted.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub movie_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub comment: String,
}
