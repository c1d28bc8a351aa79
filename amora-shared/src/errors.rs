use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Session and one-time password errors
/// - E2xxx: Profile and onboarding errors
/// - E3xxx: Feed, swipe and quota errors
/// - E4xxx: Payment errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    PayloadTooLarge,

    // Session / OTP (E1xxx)
    TokenExpired,
    TokenInvalid,
    SessionRevoked,
    OtpNotFound,
    OtpInvalid,
    OtpInactive,
    OtpExpired,
    OtpAttemptsExhausted,
    DisposableEmail,
    OtpPending,

    // Profile (E2xxx)
    ProfileNotFound,
    PhotoUploadFailed,

    // Feed (E3xxx)
    NoMoreProfiles,
    AlreadySwiped,
    CannotSwipeSelf,
    QuotaExceeded,
    PremiumExpired,

    // Payment (E4xxx)
    PaymentMethodNotAllowed,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::PayloadTooLarge => "E0006",

            // Session / OTP
            Self::TokenExpired => "E1001",
            Self::TokenInvalid => "E1002",
            Self::SessionRevoked => "E1003",
            Self::OtpNotFound => "E1004",
            Self::OtpInvalid => "E1005",
            Self::OtpInactive => "E1006",
            Self::OtpExpired => "E1007",
            Self::OtpAttemptsExhausted => "E1008",
            Self::DisposableEmail => "E1009",
            Self::OtpPending => "E1010",

            // Profile
            Self::ProfileNotFound => "E2001",
            Self::PhotoUploadFailed => "E2002",

            // Feed
            Self::NoMoreProfiles => "E3001",
            Self::AlreadySwiped => "E3002",
            Self::CannotSwipeSelf => "E3003",
            Self::QuotaExceeded => "E3004",
            Self::PremiumExpired => "E3005",

            // Payment
            Self::PaymentMethodNotAllowed => "E4001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::DisposableEmail
            | Self::OtpExpired | Self::PhotoUploadFailed | Self::CannotSwipeSelf
            | Self::PaymentMethodNotAllowed => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::ProfileNotFound | Self::NoMoreProfiles => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid
            | Self::SessionRevoked | Self::OtpNotFound | Self::OtpInvalid
            | Self::OtpInactive | Self::OtpAttemptsExhausted
            | Self::QuotaExceeded | Self::PremiumExpired => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::AlreadySwiped | Self::OtpPending => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The [`ErrorCode`] this error renders with.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                if status.is_server_error() {
                    tracing::error!(code = code.code(), error = %message, "request failed");
                }
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn known_error_envelope() {
        let value = body_json(AppError::new(ErrorCode::QuotaExceeded, "daily swipes quota exceed")).await;

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E3004");
        assert_eq!(value["error"]["message"], "daily swipes quota exceed");
        assert!(value["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn already_swiped_is_conflict() {
        let response = AppError::new(ErrorCode::AlreadySwiped, "already swiped today").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn pending_otp_is_conflict() {
        let err = AppError::new(ErrorCode::OtpPending, "otp already sent");
        assert_eq!(err.code().code(), "E1010");
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn otp_window_elapsed_is_bad_request() {
        let response = AppError::new(ErrorCode::OtpExpired, "otp expired").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::new(ErrorCode::OtpInactive, "otp expired").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let err = AppError::Internal(anyhow::anyhow!("redis connection refused"));
        assert_eq!(err.code(), ErrorCode::InternalError);

        let value = body_json(err).await;
        assert_eq!(value["error"]["code"], "E0001");
        assert_eq!(value["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn details_are_rendered() {
        let err = AppError::with_details(
            ErrorCode::ValidationError,
            "invalid request",
            serde_json::json!({ "field": "email" }),
        );
        let value = body_json(err).await;
        assert_eq!(value["error"]["details"]["field"], "email");
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError,
            ErrorCode::ValidationError,
            ErrorCode::NotFound,
            ErrorCode::Unauthorized,
            ErrorCode::Forbidden,
            ErrorCode::PayloadTooLarge,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::SessionRevoked,
            ErrorCode::OtpNotFound,
            ErrorCode::OtpInvalid,
            ErrorCode::OtpInactive,
            ErrorCode::OtpExpired,
            ErrorCode::OtpAttemptsExhausted,
            ErrorCode::DisposableEmail,
            ErrorCode::OtpPending,
            ErrorCode::ProfileNotFound,
            ErrorCode::PhotoUploadFailed,
            ErrorCode::NoMoreProfiles,
            ErrorCode::AlreadySwiped,
            ErrorCode::CannotSwipeSelf,
            ErrorCode::QuotaExceeded,
            ErrorCode::PremiumExpired,
            ErrorCode::PaymentMethodNotAllowed,
        ];
        let mut codes: Vec<_> = all.iter().map(|c| c.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
