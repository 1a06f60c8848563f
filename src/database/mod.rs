pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use models::{Movie, MovieView, NewReview, NewUser, ReviewView, User};
pub use postgres::PgStore;
pub use store::{DatabaseError, Store};
