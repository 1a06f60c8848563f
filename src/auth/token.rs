use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Longest lifetime a token kind may be configured with (ten years).
pub const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Which secret and lifetime a token is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// The user a token speaks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl From<Claims> for Subject {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            username: claims.username,
            email: claims.email,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no secret configured for {0} tokens")]
    InvalidSecret(TokenKind),

    #[error("access and refresh tokens must use different secrets")]
    DuplicateSecret,

    #[error("{0} token lifetime must be between 1 and 315360000 seconds")]
    InvalidTtl(TokenKind),

    #[error("no {kind} signing key with id '{key_id}'")]
    UnknownKey { kind: TokenKind, key_id: String },

    #[error("token signing failed: {0}")]
    Signing(String),

    /// Deliberately carries no cause: malformed, expired and forged tokens look the same.
    #[error("invalid token")]
    Invalid,
}

#[derive(Clone)]
pub struct KindSettings {
    pub key_id: String,
    pub secret: String,
    pub ttl_secs: i64,
}

#[derive(Clone)]
pub struct TokenSettings {
    pub access: KindSettings,
    pub refresh: KindSettings,
}

impl From<&SecurityConfig> for TokenSettings {
    fn from(security: &SecurityConfig) -> Self {
        Self {
            access: KindSettings {
                key_id: security.token_key_id.clone(),
                secret: security.access_token_secret.clone(),
                ttl_secs: security.access_token_ttl_secs,
            },
            refresh: KindSettings {
                key_id: security.token_key_id.clone(),
                secret: security.refresh_token_secret.clone(),
                ttl_secs: security.refresh_token_ttl_secs,
            },
        }
    }
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Keys for one token kind. The active key signs; any key in the ring verifies.
struct KeyRing {
    kind: TokenKind,
    active: String,
    ttl_secs: i64,
    keys: HashMap<String, SigningKey>,
}

impl KeyRing {
    fn new(kind: TokenKind, settings: &KindSettings) -> Result<Self, TokenError> {
        if settings.secret.is_empty() {
            return Err(TokenError::InvalidSecret(kind));
        }
        if !(1..=MAX_TTL_SECS).contains(&settings.ttl_secs) {
            return Err(TokenError::InvalidTtl(kind));
        }
        let mut keys = HashMap::new();
        keys.insert(settings.key_id.clone(), SigningKey::from_secret(&settings.secret));
        Ok(Self {
            kind,
            active: settings.key_id.clone(),
            ttl_secs: settings.ttl_secs,
            keys,
        })
    }

    fn key(&self, key_id: &str) -> Option<&SigningKey> {
        self.keys.get(key_id)
    }
}

/// Issues and verifies the stateless HS256 session tokens.
///
/// There is no server-side session record: a token is valid while its
/// signature checks out and `exp` lies in the future. Nothing revokes a token
/// early, including a refresh token that has already been exchanged.
pub struct TokenService {
    access: KeyRing,
    refresh: KeyRing,
    validation: Validation,
}

impl TokenService {
    pub fn new(settings: TokenSettings) -> Result<Self, TokenError> {
        if settings.access.secret == settings.refresh.secret && !settings.access.secret.is_empty() {
            return Err(TokenError::DuplicateSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            access: KeyRing::new(TokenKind::Access, &settings.access)?,
            refresh: KeyRing::new(TokenKind::Refresh, &settings.refresh)?,
            validation,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, TokenError> {
        Self::new(TokenSettings::from(security))
    }

    fn ring(&self, kind: TokenKind) -> &KeyRing {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Accept tokens signed under another key id, e.g. one being phased out.
    pub fn add_verification_key(&mut self, kind: TokenKind, key_id: impl Into<String>, secret: &str) -> Result<(), TokenError> {
        if secret.is_empty() {
            return Err(TokenError::InvalidSecret(kind));
        }
        let ring = match kind {
            TokenKind::Access => &mut self.access,
            TokenKind::Refresh => &mut self.refresh,
        };
        ring.keys.insert(key_id.into(), SigningKey::from_secret(secret));
        Ok(())
    }

    pub fn ttl_secs(&self, kind: TokenKind) -> i64 {
        self.ring(kind).ttl_secs
    }

    pub fn issue(&self, kind: TokenKind, subject: &Subject) -> Result<String, TokenError> {
        self.issue_at(kind, subject, Utc::now().timestamp())
    }

    pub fn issue_at(&self, kind: TokenKind, subject: &Subject, now: i64) -> Result<String, TokenError> {
        let ring = self.ring(kind);
        self.issue_with_key(kind, &ring.active, subject, now)
    }

    pub fn issue_with_key(&self, kind: TokenKind, key_id: &str, subject: &Subject, now: i64) -> Result<String, TokenError> {
        let ring = self.ring(kind);
        let key = ring.key(key_id).ok_or_else(|| TokenError::UnknownKey {
            kind,
            key_id: key_id.to_string(),
        })?;

        let claims = Claims {
            id: subject.id,
            username: subject.username.clone(),
            email: subject.email.clone(),
            kind,
            iat: now,
            exp: now
                .checked_add(ring.ttl_secs)
                .ok_or_else(|| TokenError::Signing(format!("expiry overflows at now={}", now)))?,
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(key_id.to_string());

        encode(&header, &claims, &key.encoding).map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn issue_pair(&self, subject: &Subject) -> Result<TokenPair, TokenError> {
        self.issue_pair_at(subject, Utc::now().timestamp())
    }

    pub fn issue_pair_at(&self, subject: &Subject, now: i64) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_at(TokenKind::Access, subject, now)?,
            refresh_token: self.issue_at(TokenKind::Refresh, subject, now)?,
        })
    }

    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Subject, TokenError> {
        self.verify_at(kind, token, Utc::now().timestamp())
    }

    pub fn verify_at(&self, kind: TokenKind, token: &str, now: i64) -> Result<Subject, TokenError> {
        let ring = self.ring(kind);

        let header = decode_header(token).map_err(|e| reject(kind, format!("malformed token: {}", e)))?;
        let key_id = header.kid.as_deref().unwrap_or(ring.active.as_str());
        let key = ring
            .key(key_id)
            .ok_or_else(|| reject(kind, format!("unknown key id '{}'", key_id)))?;

        let claims = decode::<Claims>(token, &key.decoding, &self.validation)
            .map_err(|e| reject(kind, e))?
            .claims;

        if claims.kind != ring.kind {
            return Err(reject(kind, format!("{} token presented", claims.kind)));
        }
        if claims.exp <= now {
            return Err(reject(kind, "token expired"));
        }

        Ok(claims.into())
    }

    /// Trade a refresh token for a fresh pair. The old refresh token stays valid.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        self.refresh_at(refresh_token, Utc::now().timestamp())
    }

    pub fn refresh_at(&self, refresh_token: &str, now: i64) -> Result<TokenPair, TokenError> {
        let subject = self.verify_at(TokenKind::Refresh, refresh_token, now)?;
        self.issue_pair_at(&subject, now)
    }
}

fn reject(kind: TokenKind, reason: impl fmt::Display) -> TokenError {
    tracing::debug!("Rejected {} token: {}", kind, reason);
    TokenError::Invalid
}
