use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;

use super::models::{Movie, NewReview, NewUser, ReviewView, User};
use super::store::{DatabaseError, Store};
use crate::services::rating::RatingSummary;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct MovieEntry {
    id: i64,
    title: String,
    rating: RatingSummary,
}

impl MovieEntry {
    fn to_movie(&self) -> Movie {
        Movie {
            id: self.id,
            title: self.title.clone(),
            avg_rating: self.rating.avg_rating,
            rater_num: self.rating.rater_num,
        }
    }
}

struct ReviewRow {
    id: i64,
    movie_id: i64,
    user_id: i64,
    rating: i32,
    comment: String,
}

/// Process-local store with the same contract as the PostgreSQL one.
///
/// Every movie sits behind its own mutex, so `record_review` calls for the
/// same movie run one at a time while different movies proceed in parallel.
/// Lock order is movie, then reviews, then users.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<BTreeMap<i64, User>>,
    movies: RwLock<BTreeMap<i64, Arc<Mutex<MovieEntry>>>>,
    reviews: Mutex<Vec<ReviewRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn seed_user(&self, username: &str, email: &str) -> User {
        let mut users = lock(&self.users);
        let id = users.keys().next_back().map_or(1, |last| last + 1);
        let user = User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: String::new(),
        };
        users.insert(id, user.clone());
        user
    }

    fn movie_entry(&self, movie_id: i64) -> Option<Arc<Mutex<MovieEntry>>> {
        let movies = self.movies.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        movies.get(&movie_id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(lock(&self.users).values().find(|u| u.email == email).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        Ok(lock(&self.users).values().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DatabaseError> {
        Ok(lock(&self.users).values().any(|u| u.email == email))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut users = lock(&self.users);
        if users.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::Conflict("username"));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Conflict("email"));
        }

        let id = users.keys().next_back().map_or(1, |last| last + 1);
        let created = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
        };
        users.insert(id, created.clone());
        Ok(created)
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, DatabaseError> {
        let movies = self.movies.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(movies.values().map(|entry| lock(entry).to_movie()).collect())
    }

    async fn create_movie(&self, title: &str) -> Result<Movie, DatabaseError> {
        let mut movies = self.movies.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = movies.keys().next_back().map_or(1, |last| last + 1);
        let entry = MovieEntry {
            id,
            title: title.to_string(),
            rating: RatingSummary::default(),
        };
        let movie = entry.to_movie();
        movies.insert(id, Arc::new(Mutex::new(entry)));
        Ok(movie)
    }

    async fn list_reviews(&self, movie_id: i64) -> Result<Vec<ReviewView>, DatabaseError> {
        let reviews = lock(&self.reviews);
        let users = lock(&self.users);
        Ok(reviews
            .iter()
            .filter(|r| r.movie_id == movie_id)
            .filter_map(|r| {
                users.get(&r.user_id).map(|author| ReviewView {
                    id: r.id,
                    rating: r.rating,
                    comment: r.comment.clone(),
                    username: author.username.clone(),
                })
            })
            .collect())
    }

    async fn record_review(&self, review: NewReview) -> Result<RatingSummary, DatabaseError> {
        let entry = self
            .movie_entry(review.movie_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("movie {}", review.movie_id)))?;

        // Held until both the aggregate and the review row are written.
        let mut movie = lock(&entry);
        let next = movie.rating.with_rating(review.rating);

        let mut reviews = lock(&self.reviews);
        let id = reviews.last().map_or(1, |last| last.id + 1);
        reviews.push(ReviewRow {
            id,
            movie_id: review.movie_id,
            user_id: review.user_id,
            rating: review.rating,
            comment: review.comment,
        });
        movie.rating = next;

        Ok(next)
    }
}
