// handlers/public/auth/utils.rs - Credential validation and session payloads

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::auth::password::MAX_PASSWORD_BYTES;
use crate::auth::TokenPair;
use crate::database::User;

// Minimum lengths are in bytes.
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_USERNAME_LEN: usize = 3;

// ASCII-only `\w` and `\b`: accented local parts and domains are refused.
static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b[\w\.-]+@[\w\.-]+\.\w{2,4}\b)").expect("email pattern compiles"));

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("Empty email");
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format");
    }
    Ok(())
}

/// bcrypt only reads the first 72 bytes, so longer passwords are refused
/// rather than silently truncated.
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err("Password too short (must be at least 8 characters)");
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err("Password too long (must be at most 72 bytes)");
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < MIN_USERNAME_LEN {
        return Err("Username too short (must be at least 3 characters)");
    }
    Ok(())
}

/// Body returned by register and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
    pub email: String,
}

impl SessionResponse {
    pub fn new(tokens: TokenPair, user: User) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            username: user.username,
            email: user.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert_eq!(validate_email(""), Err("Empty email"));
        assert_eq!(validate_email("not-an-email"), Err("Invalid email format"));
        assert_eq!(validate_email("a@b"), Err("Invalid email format"));
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("first.last-x@mail.example.org").is_ok());
    }

    #[test]
    fn email_word_classes_are_ascii() {
        assert_eq!(validate_email("josé@example.com"), Err("Invalid email format"));
        assert_eq!(validate_email("ü@ü.üü"), Err("Invalid email format"));
        assert_eq!(validate_email("jose@exämple.com"), Err("Invalid email format"));
        assert!(validate_email("jose_1@example.co").is_ok());
    }

    #[test]
    fn password_bounds() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("éééé").is_ok());
        assert!(validate_password("ééé").is_err());
        assert!(validate_password(&"x".repeat(72)).is_ok());
        assert_eq!(
            validate_password(&"x".repeat(73)),
            Err("Password too long (must be at most 72 bytes)")
        );
    }

    #[test]
    fn username_bounds() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("abc").is_ok());
        // Counted in bytes: two accented letters are four.
        assert!(validate_username("éé").is_ok());
        assert!(validate_username("é").is_err());
    }
}
