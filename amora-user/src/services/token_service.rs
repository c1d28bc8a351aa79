use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::auth::Claims;

use crate::config::AppConfig;

/// Issues and verifies session tokens.
///
/// RS256 is used when an RSA key pair is configured (both halves as
/// base64-encoded PEM), HS256 with the shared secret otherwise.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl TokenService {
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        match config.token_public_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(public_key) => Self::rsa(&config.token_secret_key, public_key, config.session_ttl()),
            None => Self::hmac(&config.token_secret_key, config.session_ttl()),
        }
    }

    pub fn hmac(secret: &str, ttl: Duration) -> AppResult<Self> {
        if secret.is_empty() {
            return Err(AppError::internal("token secret key is not configured"));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
            ttl,
        })
    }

    pub fn rsa(private_key_b64: &str, public_key_b64: &str, ttl: Duration) -> AppResult<Self> {
        let private_pem = decode_key(private_key_b64, "private")?;
        let public_pem = decode_key(public_key_b64, "public")?;

        let encoding = EncodingKey::from_rsa_pem(&private_pem)
            .map_err(|e| AppError::internal(format!("invalid RSA private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(&public_pem)
            .map_err(|e| AppError::internal(format!("invalid RSA public key: {e}")))?;

        Ok(Self { encoding, decoding, algorithm: Algorithm::RS256, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid, email: &str, profile_id: Uuid, now: DateTime<Utc>) -> AppResult<String> {
        let claims = Claims::new(user_id, email, profile_id, now, self.ttl);
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::new(ErrorCode::TokenExpired, "token has expired"),
                _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
            })
    }
}

fn decode_key(encoded: &str, which: &str) -> AppResult<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::internal(format!("{which} key is not valid base64: {e}")))
}
