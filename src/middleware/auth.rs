use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{Subject, TokenKind};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context recovered from the access token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<Subject> for AuthUser {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id,
            username: subject.username,
            email: subject.email,
        }
    }
}

/// Access-token gate for protected routes.
///
/// On success the recovered [`AuthUser`] is placed in the request extensions
/// and the wrapped handler runs. Every failure is the same
/// `401 {"error":"Unauthorized"}` and the handler never runs.
pub async fn require_access(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        tracing::debug!("Missing or malformed Authorization header on {}", request.uri().path());
        ApiError::unauthorized()
    })?;

    let subject = state.tokens.verify(TokenKind::Access, token)?;

    request.extensions_mut().insert(AuthUser::from(subject));
    Ok(next.run(request).await)
}

/// Raw bearer token from the Authorization header, for handlers that verify it themselves.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(&parts.headers)
            .map(|token| BearerToken(token.to_string()))
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
