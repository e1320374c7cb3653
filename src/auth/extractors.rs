use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use tracing::warn;

use super::services::{AuthError, Claims, JwtKeys};
use crate::error::ApiError;

/// Extracts and validates the bearer token, yielding its claims.
pub struct AuthUser(pub Claims);

/// Expects "Bearer <token>". No header, or a header with no credential, is a
/// missing token; any other scheme is an invalid one.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err(AuthError::MissingToken);
    };
    let value = value.to_str().map_err(|_| AuthError::InvalidToken)?;
    let mut words = value.split_whitespace();
    let scheme = words.next().unwrap_or_default();
    let Some(token) = words.next() else {
        return Err(AuthError::MissingToken);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidToken);
    }
    Ok(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let keys = Arc::<JwtKeys>::from_ref(state);
        let claims = keys.verify_token(token).map_err(|e| {
            warn!(error = ?e, "rejected bearer token");
            e
        })?;

        Ok(AuthUser(claims))
    }
}
