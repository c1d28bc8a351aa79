use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::AccessToken;

use crate::clock::Clock;
use crate::disposable::is_disposable;
use crate::models::{Profile, ProfileView, UserStatus, UserSummary};
use crate::repository::Repository;
use crate::services::otp_service::OtpService;
use crate::services::quota_service::QuotaService;
use crate::services::token_service::TokenService;
use crate::session::{session_key, SessionStore};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResendOtpRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResendOtpResponse {
    pub message: String,
    pub resend_otp_interval: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AuthRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "otp is required"))]
    pub otp: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validation_error(e: validator::ValidationErrors) -> AppError {
    let mut fields: Vec<&str> = e.field_errors().keys().copied().collect();
    fields.sort_unstable();
    AppError::with_details(ErrorCode::ValidationError, e.to_string(), serde_json::json!({ "fields": fields }))
}

/// Passwordless login: OTP delivery, session issue/revoke, and the
/// caller's own profile.
#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn Repository>,
    otp: OtpService,
    quota: QuotaService,
    tokens: TokenService,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    allow_disposable_email: bool,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn Repository>,
        otp: OtpService,
        quota: QuotaService,
        tokens: TokenService,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        allow_disposable_email: bool,
    ) -> Self {
        Self { repo, otp, quota, tokens, sessions, clock, allow_disposable_email }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub async fn resend_otp(&self, req: ResendOtpRequest) -> AppResult<ResendOtpResponse> {
        req.validate().map_err(validation_error)?;
        let email = normalize_email(&req.email);

        if !self.allow_disposable_email && is_disposable(&email) {
            return Err(AppError::new(ErrorCode::DisposableEmail, "disposable email is not allowed"));
        }

        let requested = self.otp.request_otp(&email).await?;
        Ok(ResendOtpResponse {
            message: format!("OTP already sent to your email: {email}."),
            resend_otp_interval: requested.interval_secs,
        })
    }

    /// Verifies the code, activates first-time users, and opens a session.
    pub async fn login_or_register(&self, req: AuthRequest) -> AppResult<AccessToken> {
        req.validate().map_err(validation_error)?;
        let email = normalize_email(&req.email);

        let (user, log) = self.otp.verify_otp(&email, req.otp.trim()).await?;
        let now = self.clock.now();

        let profile = match user.status {
            UserStatus::Unverified => {
                let profile = self
                    .repo
                    .activate_user(user.id, &Profile::blank(user.id, now), now)
                    .await?;
                tracing::info!(user_id = %user.id, profile_id = %profile.id, "user activated");
                profile
            }
            UserStatus::Active => self
                .repo
                .find_profile_by_user(user.id)
                .await?
                .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?,
            UserStatus::Deactive => {
                return Err(AppError::new(ErrorCode::Forbidden, "account is deactivated"));
            }
        };

        let token = self.tokens.issue(user.id, &user.email, profile.id, now)?;
        self.sessions
            .set(&session_key(user.id), &token, self.tokens.ttl())
            .await?;
        self.otp.consume(&log).await?;

        tracing::info!(user_id = %user.id, profile_id = %profile.id, "user logged in");
        Ok(AccessToken::bearer(token, self.tokens.ttl().num_seconds()))
    }

    pub async fn logout(&self, user_id: Uuid, token_id: Uuid) -> AppResult<()> {
        self.sessions.del(&session_key(user_id)).await?;
        tracing::info!(user_id = %user_id, token_id = %token_id, "user logged out");
        Ok(())
    }

    /// The caller's profile with their account summary. `daily_swap_quota`
    /// holds today's remaining swipes.
    pub async fn show_profile(&self, user_id: Uuid) -> AppResult<ProfileView> {
        let user = self
            .repo
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;
        let profile = self
            .repo
            .find_profile_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

        let mut view = ProfileView::from(&profile);
        view.daily_swap_quota = self.quota.remaining_for(&profile).await?;
        view.user = Some(UserSummary::from(&user));
        Ok(view)
    }
}
