use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use serde::Deserialize;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::AuthUser;

use crate::clock::Clock;
use crate::models::{Payment, PaymentMethod, PaymentStatus, PremiumGrant, UNLIMITED_QUOTA};
use crate::repository::Repository;

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: f64,
    pub identifier: String,
    pub payment_method: String,
    pub payment_data: String,
}

/// One month of unlimited swipes from `now`.
pub fn premium_grant(now: DateTime<Utc>) -> PremiumGrant {
    PremiumGrant {
        valid_until: now
            .checked_add_months(Months::new(1))
            .unwrap_or(now + chrono::Duration::days(30)),
        daily_swipe_quota: UNLIMITED_QUOTA,
    }
}

#[derive(Clone)]
pub struct PaymentService {
    repo: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
}

impl PaymentService {
    pub fn new(repo: Arc<dyn Repository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Records a settled payment and upgrades the caller to premium.
    pub async fn create_payment(&self, auth: &AuthUser, req: PaymentRequest) -> AppResult<Payment> {
        if !req.amount.is_finite() || req.amount < 0.0 {
            return Err(AppError::new(ErrorCode::ValidationError, "amount must be zero or more"));
        }
        let identifier = req.identifier.trim();
        if identifier.is_empty() {
            return Err(AppError::new(ErrorCode::ValidationError, "missing identifier"));
        }
        if req.payment_data.trim().is_empty() {
            return Err(AppError::new(ErrorCode::ValidationError, "missing payment data"));
        }
        let method = PaymentMethod::parse_loose(&req.payment_method)
            .ok_or_else(|| AppError::new(ErrorCode::PaymentMethodNotAllowed, "payment method not allowed"))?;

        let now = self.clock.now();
        let payment = Payment {
            id: Uuid::now_v7(),
            user_id: auth.id,
            amount: req.amount,
            identifier: identifier.to_string(),
            payment_method: method,
            payment_data: req.payment_data,
            status: PaymentStatus::Success,
            created_at: now,
        };
        let grant = premium_grant(now);

        let payment = self.repo.record_payment(&payment, auth.profile_id, grant).await?;
        tracing::info!(
            user_id = %auth.id,
            profile_id = %auth.profile_id,
            payment_id = %payment.id,
            method = %method,
            valid_until = %grant.valid_until,
            "premium purchased"
        );
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::Profile;
    use crate::testing::{complete_profile, t0, FixedClock, MemoryRepository};

    fn setup() -> (Arc<MemoryRepository>, PaymentService, Profile, AuthUser) {
        let repo = Arc::new(MemoryRepository::default());
        let profile = repo.insert_profile(complete_profile(t0()));
        let service = PaymentService::new(repo.clone(), Arc::new(FixedClock::at(t0())));
        let auth = AuthUser {
            id: profile.user_id,
            email: "a@x.com".into(),
            profile_id: profile.id,
            token_id: Uuid::now_v7(),
        };
        (repo, service, profile, auth)
    }

    fn request(method: &str) -> PaymentRequest {
        PaymentRequest {
            amount: 49_000.0,
            identifier: "INV-001".into(),
            payment_method: method.into(),
            payment_data: "{\"va\":\"8808123\"}".into(),
        }
    }

    #[test]
    fn grant_spans_one_calendar_month() {
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap();
        let grant = premium_grant(at);
        assert_eq!(grant.valid_until, Utc.with_ymd_and_hms(2024, 2, 29, 10, 0, 0).unwrap());
        assert_eq!(grant.daily_swipe_quota, UNLIMITED_QUOTA);
    }

    #[tokio::test]
    async fn payment_upgrades_profile() {
        let (repo, service, profile, auth) = setup();
        let payment = service.create_payment(&auth, request("virtual account")).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.payment_method, PaymentMethod::VirtualAccount);
        assert_eq!(repo.state().payments.len(), 1);

        let stored = repo.profile(profile.id);
        assert!(stored.is_premium);
        assert_eq!(stored.daily_swipe_quota, UNLIMITED_QUOTA);
        assert_eq!(stored.premium_valid_until, Some(premium_grant(t0()).valid_until));
    }

    #[tokio::test]
    async fn unknown_method_is_refused() {
        let (repo, service, profile, auth) = setup();
        let err = service.create_payment(&auth, request("cash")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PaymentMethodNotAllowed);
        assert!(repo.state().payments.is_empty());
        assert!(!repo.profile(profile.id).is_premium);
    }

    #[tokio::test]
    async fn field_validation() {
        let (_, service, _, auth) = setup();

        let err = service
            .create_payment(&auth, PaymentRequest { amount: -1.0, ..request("e-wallet") })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = service
            .create_payment(&auth, PaymentRequest { identifier: " ".into(), ..request("e-wallet") })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "missing identifier");

        let err = service
            .create_payment(&auth, PaymentRequest { payment_data: String::new(), ..request("e-wallet") })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "missing payment data");
    }
}
