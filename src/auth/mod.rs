pub mod password;
pub mod token;

pub use password::{HashError, PasswordHasher};
pub use token::{Subject, TokenError, TokenKind, TokenPair, TokenService, TokenSettings};
