use std::sync::Arc;

use chrono::Duration;
use metrics::counter;
use rand::Rng;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::mailer::{MailTemplate, Mailer};
use crate::models::{OtpLog, OtpStatus, OtpType, User};
use crate::repository::Repository;

#[derive(Debug, Clone, Copy)]
pub struct OtpSettings {
    pub resend_interval: Duration,
    pub max_attempts: i32,
    pub expiry: Duration,
}

impl From<&AppConfig> for OtpSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            resend_interval: config.resend_interval(),
            max_attempts: config.otp_max_try_limit,
            expiry: config.otp_expiry(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OtpRequested {
    pub user: User,
    pub interval_secs: i64,
    /// False when a code was already mailed within the resend window.
    pub sent: bool,
}

pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

/// Issues, verifies and retires email one-time passwords.
#[derive(Clone)]
pub struct OtpService {
    repo: Arc<dyn Repository>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    settings: OtpSettings,
}

impl OtpService {
    pub fn new(
        repo: Arc<dyn Repository>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: OtpSettings,
    ) -> Self {
        Self { repo, mailer, clock, settings }
    }

    pub fn settings(&self) -> OtpSettings {
        self.settings
    }

    pub async fn request_otp(&self, email: &str) -> AppResult<OtpRequested> {
        let now = self.clock.now();
        let interval_secs = self.settings.resend_interval.num_seconds();

        let user = self.repo.find_or_create_user(&User::register(email, now)).await?;

        let recent = self
            .repo
            .count_otp_between(user.id, OtpType::Email, now - self.settings.resend_interval, now)
            .await?;
        if recent > 0 {
            tracing::debug!(user_id = %user.id, "otp resend suppressed inside cooldown");
            return Ok(OtpRequested { user, interval_secs, sent: false });
        }

        let code = generate_code();
        self.mailer
            .send(&user.email, MailTemplate::Login { code: code.clone() })
            .await?;

        let log = OtpLog::issue(user.id, OtpType::Email, code, self.settings.max_attempts, now);
        match self.repo.create_otp(&log).await {
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::OtpPending => {
                tracing::debug!(user_id = %user.id, "concurrent otp request already stored a code");
                return Ok(OtpRequested { user, interval_secs, sent: false });
            }
            Err(e) => return Err(e),
        }

        counter!("otp_issued_total").increment(1);
        tracing::info!(user_id = %user.id, otp_id = %log.id, "otp issued");

        Ok(OtpRequested { user, interval_secs, sent: true })
    }

    /// Checks `code` against the user's latest email code. On success the
    /// log is returned still UNUSED; call [`OtpService::consume`] once the
    /// login has gone through.
    pub async fn verify_otp(&self, email: &str, code: &str) -> AppResult<(User, OtpLog)> {
        let now = self.clock.now();

        let user = self
            .repo
            .find_user_by_email(email)
            .await?
            .ok_or_else(otp_not_found)?;
        let log = self
            .repo
            .latest_otp(user.id, OtpType::Email)
            .await?
            .ok_or_else(otp_not_found)?;

        if log.remaining_attempts <= 0 {
            self.transition(&log, OtpStatus::Expired, 0).await?;
            return Err(self.reject("exhausted", attempts_exhausted()));
        }

        if log.code != code {
            let remaining = log.remaining_attempts - 1;
            if remaining <= 0 {
                self.transition(&log, OtpStatus::Expired, 0).await?;
                return Err(self.reject("exhausted", attempts_exhausted()));
            }
            self.transition(&log, OtpStatus::Unused, remaining).await?;
            return Err(self.reject("mismatch", AppError::new(ErrorCode::OtpInvalid, "invalid otp")));
        }

        if log.status != OtpStatus::Unused {
            return Err(self.reject("inactive", AppError::new(ErrorCode::OtpInactive, "otp expired")));
        }

        if now > log.created_at + self.settings.expiry {
            self.transition(&log, OtpStatus::Expired, log.remaining_attempts).await?;
            return Err(self.reject("expired", AppError::new(ErrorCode::OtpExpired, "otp expired")));
        }

        Ok((user, log))
    }

    /// Retires a verified code. USED is terminal.
    pub async fn consume(&self, log: &OtpLog) -> AppResult<()> {
        let remaining = (log.remaining_attempts - 1).max(0);
        self.repo
            .update_otp(log.id, OtpStatus::Used, remaining, self.clock.now())
            .await
    }

    /// Persists a state change, but never rewrites a log that already left
    /// UNUSED.
    async fn transition(&self, log: &OtpLog, status: OtpStatus, remaining: i32) -> AppResult<()> {
        if log.status != OtpStatus::Unused {
            return Ok(());
        }
        self.repo
            .update_otp(log.id, status, remaining, self.clock.now())
            .await
    }

    fn reject(&self, reason: &'static str, err: AppError) -> AppError {
        counter!("otp_verification_failures_total", "reason" => reason).increment(1);
        err
    }
}

fn otp_not_found() -> AppError {
    AppError::new(ErrorCode::OtpNotFound, "otp not found, please request a new one")
}

fn attempts_exhausted() -> AppError {
    AppError::new(ErrorCode::OtpAttemptsExhausted, "too many attempts, otp expired")
}
