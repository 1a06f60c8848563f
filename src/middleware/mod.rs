pub mod auth;
pub mod response;

pub use auth::{require_access, AuthUser, BearerToken};
pub use response::{ApiJson, ApiResponse, ApiResult};
