pub mod rating;

pub use rating::{RatingAggregator, RatingSummary, ReviewError, ReviewSubmission};
