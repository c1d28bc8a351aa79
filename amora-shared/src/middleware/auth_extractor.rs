use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims};

/// Verifies session tokens and knows whether a user's session is still live.
///
/// Router state implements this so [`AuthUser`] can be extracted from any
/// handler without the extractor knowing about keys or the session store.
#[async_trait::async_trait]
pub trait SessionAuthority: Send + Sync {
    fn decode_token(&self, token: &str) -> Result<Claims, AppError>;

    async fn has_session(&self, user_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait::async_trait]
impl<T> SessionAuthority for Arc<T>
where
    T: SessionAuthority + ?Sized,
{
    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        (**self).decode_token(token)
    }

    async fn has_session(&self, user_id: Uuid) -> Result<bool, AppError> {
        (**self).has_session(user_id).await
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: SessionAuthority,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = state.decode_token(&token)?;

        if !state.has_session(claims.sub).await? {
            return Err(AppError::new(
                ErrorCode::SessionRevoked,
                "user already logged out, please login",
            ));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme")),
    }
}
