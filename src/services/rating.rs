use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::database::{DatabaseError, NewReview, Store};

pub const MIN_RATING: i64 = 0;
pub const MAX_RATING: i64 = 5;
pub const MAX_COMMENT_CHARS: usize = 500;

/// Round to one decimal place, halves away from zero (3.25 -> 3.3, 3.35 -> 3.4).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Denormalized rating state of one movie.
///
/// `avg_rating` is what clients see. `rating_total` is the exact sum of every
/// rating counted in `rater_num`; the average is always derived from it so
/// the published value does not depend on the order reviews arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub avg_rating: f64,
    pub rater_num: i64,
    #[serde(skip)]
    pub rating_total: i64,
}

impl RatingSummary {
    /// State after one more rating has been counted.
    pub fn with_rating(&self, rating: i32) -> RatingSummary {
        let rater_num = self.rater_num + 1;
        let rating_total = self.rating_total + i64::from(rating);
        RatingSummary {
            avg_rating: round1(rating_total as f64 / rater_num as f64),
            rater_num,
            rating_total,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Rating out of range (should be 0 - 5)")]
    RatingOutOfRange,

    #[error("Comment exceeded limit (500 characters)")]
    CommentTooLong,

    #[error("Movie does not exist")]
    MovieNotFound,

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for ReviewError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(_) => ReviewError::MovieNotFound,
            other => ReviewError::Database(other),
        }
    }
}

/// Review input as it arrives from a client, before range checks.
#[derive(Debug, Clone)]
pub struct ReviewSubmission {
    pub movie_id: i64,
    pub user_id: i64,
    pub rating: i64,
    pub comment: String,
}

impl ReviewSubmission {
    pub fn validate(self) -> Result<NewReview, ReviewError> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(ReviewError::RatingOutOfRange);
        }
        if self.comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(ReviewError::CommentTooLong);
        }
        Ok(NewReview {
            movie_id: self.movie_id,
            user_id: self.user_id,
            // In range 0..=5, so the narrowing is exact.
            rating: self.rating as i32,
            comment: self.comment,
        })
    }
}

/// Folds new reviews into a movie's aggregate rating.
///
/// Validation happens before the store is touched. The read-modify-write of
/// the movie's `(avg_rating, rater_num)` pair is delegated to
/// [`Store::record_review`], which runs it atomically per movie.
#[derive(Clone)]
pub struct RatingAggregator {
    store: Arc<dyn Store>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn apply_review(&self, submission: ReviewSubmission) -> Result<RatingSummary, ReviewError> {
        let review = submission.validate()?;
        let movie_id = review.movie_id;
        let summary = self.store.record_review(review).await?;

        tracing::debug!(
            "Movie {} now rated {} by {} reviewers",
            movie_id,
            summary.avg_rating,
            summary.rater_num
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn fold(ratings: &[i32]) -> RatingSummary {
        ratings
            .iter()
            .fold(RatingSummary::default(), |summary, &rating| summary.with_rating(rating))
    }

    fn permutations(items: &[i32]) -> Vec<Vec<i32>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn round1_rounds_halves_away_from_zero() {
        assert_eq!(round1(3.25), 3.3);
        assert_eq!(round1(0.25), 0.3);
        assert_eq!(round1(2.75), 2.8);
        assert_eq!(round1(3.24), 3.2);
        assert_eq!(round1(-0.25), -0.3);
        assert_eq!(round1(3.5), 3.5);
    }

    #[test]
    fn adding_four_to_single_three_gives_three_and_a_half() {
        let start = RatingSummary::default().with_rating(3);
        assert_eq!(start.avg_rating, 3.0);
        assert_eq!(start.rater_num, 1);

        let next = start.with_rating(4);
        assert_eq!(next.avg_rating, 3.5);
        assert_eq!(next.rater_num, 2);
    }

    #[test]
    fn first_review_sets_the_average() {
        assert_eq!(RatingSummary::default().with_rating(0).avg_rating, 0.0);
        assert_eq!(RatingSummary::default().with_rating(5).avg_rating, 5.0);
    }

    #[test]
    fn average_is_independent_of_arrival_order() {
        // The last set drifts to 4.2 in some orders if the rounded average is reused.
        let sets: [&[i32]; 5] = [
            &[1, 2, 3, 4, 5],
            &[0, 1, 1, 1],
            &[0, 5, 5, 2],
            &[2, 3, 3, 3, 3, 3, 3],
            &[5, 4, 4, 4, 4, 4, 4, 4],
        ];
        for ratings in sets {
            let expected_mean = ratings.iter().sum::<i32>() as f64 / ratings.len() as f64;
            for order in permutations(ratings) {
                let summary = fold(&order);
                assert_eq!(summary.rater_num, ratings.len() as i64);
                assert_eq!(summary.avg_rating, round1(expected_mean), "order {:?}", order);
            }
        }
    }

    #[test]
    fn validation_bounds() {
        let base = ReviewSubmission {
            movie_id: 1,
            user_id: 1,
            rating: 0,
            comment: String::new(),
        };
        assert!(base.clone().validate().is_ok());
        assert!(ReviewSubmission { rating: 5, ..base.clone() }.validate().is_ok());
        assert!(matches!(
            ReviewSubmission { rating: 6, ..base.clone() }.validate(),
            Err(ReviewError::RatingOutOfRange)
        ));
        assert!(matches!(
            ReviewSubmission { rating: -1, ..base.clone() }.validate(),
            Err(ReviewError::RatingOutOfRange)
        ));
        assert!(ReviewSubmission {
            comment: "é".repeat(500),
            ..base.clone()
        }
        .validate()
        .is_ok());
        assert!(matches!(
            ReviewSubmission {
                comment: "x".repeat(501),
                ..base
            }
            .validate(),
            Err(ReviewError::CommentTooLong)
        ));
    }

    #[test]
    fn error_messages_match_api_contract() {
        assert_eq!(ReviewError::RatingOutOfRange.to_string(), "Rating out of range (should be 0 - 5)");
        assert_eq!(ReviewError::CommentTooLong.to_string(), "Comment exceeded limit (500 characters)");
    }

    #[tokio::test]
    async fn apply_review_updates_store() {
        let store = Arc::new(MemoryStore::new());
        let user = store.seed_user("alice123", "alice@example.com");
        let movie = store.create_movie("Alien").await.unwrap();
        let aggregator = RatingAggregator::new(store.clone());

        let submit = |rating| ReviewSubmission {
            movie_id: movie.id,
            user_id: user.id,
            rating,
            comment: "ok".to_string(),
        };

        aggregator.apply_review(submit(3)).await.unwrap();
        let summary = aggregator.apply_review(submit(4)).await.unwrap();
        assert_eq!(summary.avg_rating, 3.5);
        assert_eq!(summary.rater_num, 2);

        let movies = store.list_movies().await.unwrap();
        assert_eq!(movies[0].avg_rating, 3.5);
        assert_eq!(movies[0].rater_num, 2);
        assert_eq!(store.list_reviews(movie.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_reviews_leave_movie_untouched() {
        let store = Arc::new(MemoryStore::new());
        let user = store.seed_user("alice123", "alice@example.com");
        let movie = store.create_movie("Alien").await.unwrap();
        let aggregator = RatingAggregator::new(store.clone());

        let result = aggregator
            .apply_review(ReviewSubmission {
                movie_id: movie.id,
                user_id: user.id,
                rating: 6,
                comment: String::new(),
            })
            .await;
        assert!(matches!(result, Err(ReviewError::RatingOutOfRange)));

        let missing = aggregator
            .apply_review(ReviewSubmission {
                movie_id: movie.id + 100,
                user_id: user.id,
                rating: 4,
                comment: String::new(),
            })
            .await;
        assert!(matches!(missing, Err(ReviewError::MovieNotFound)));

        let movies = store.list_movies().await.unwrap();
        assert_eq!(movies[0].rater_num, 0);
        assert!(store.list_reviews(movie.id).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reviews_are_all_counted() {
        let store = Arc::new(MemoryStore::new());
        let user = store.seed_user("alice123", "alice@example.com");
        let movie = store.create_movie("Alien").await.unwrap();
        let aggregator = RatingAggregator::new(store.clone());
        let (movie_id, user_id) = (movie.id, user.id);

        let ratings: Vec<i64> = (0..60).map(|i| i % 6).collect();
        let handles: Vec<_> = ratings
            .iter()
            .map(|&rating| {
                let aggregator = aggregator.clone();
                tokio::spawn(async move {
                    aggregator
                        .apply_review(ReviewSubmission {
                            movie_id,
                            user_id,
                            rating,
                            comment: String::new(),
                        })
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let movies = store.list_movies().await.unwrap();
        let mean = ratings.iter().sum::<i64>() as f64 / ratings.len() as f64;
        assert_eq!(movies[0].rater_num, 60);
        assert_eq!(movies[0].avg_rating, round1(mean));
        assert_eq!(store.list_reviews(movie.id).await.unwrap().len(), 60);
    }
}
