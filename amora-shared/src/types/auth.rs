use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session token claims. A token is bound to one user, their email, and
/// the profile created for them on first login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub profile_id: Uuid,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        email: impl Into<String>,
        profile_id: Uuid,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let now = issued_at.timestamp();
        Self {
            sub: user_id,
            email: email.into(),
            profile_id,
            iat: now,
            nbf: now,
            exp: now + ttl.num_seconds(),
            jti: Uuid::now_v7(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub profile_id: Uuid,
    pub token_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            profile_id: claims.profile_id,
            token_id: claims.jti,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AccessToken {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}
