use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::clock::Clock;
use crate::models::{Profile, DEFAULT_DAILY_SWIPE_QUOTA, UNLIMITED_QUOTA};
use crate::repository::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed,
    /// Premium flag is set but the entitlement has lapsed.
    PremiumExpired,
    Exhausted { used: i64, quota: i32 },
}

/// Premium with no end date counts as lapsed.
pub fn premium_lapsed(profile: &Profile, now: DateTime<Utc>) -> bool {
    profile.is_premium && profile.premium_valid_until.map_or(true, |until| until < now)
}

pub fn evaluate_quota(profile: &Profile, decided_today: i64, now: DateTime<Utc>) -> QuotaDecision {
    if profile.is_premium {
        return if premium_lapsed(profile, now) {
            QuotaDecision::PremiumExpired
        } else {
            QuotaDecision::Allowed
        };
    }
    if profile.has_unlimited_swipes() {
        return QuotaDecision::Allowed;
    }
    if decided_today >= i64::from(profile.daily_swipe_quota) {
        QuotaDecision::Exhausted { used: decided_today, quota: profile.daily_swipe_quota }
    } else {
        QuotaDecision::Allowed
    }
}

/// Swipes left today, or [`UNLIMITED_QUOTA`] for unlimited profiles.
pub fn remaining_quota(profile: &Profile, decided_today: i64) -> i32 {
    if profile.has_unlimited_swipes() {
        return UNLIMITED_QUOTA;
    }
    let left = i64::from(profile.daily_swipe_quota) - decided_today;
    i32::try_from(left.max(0)).unwrap_or(0)
}

/// Daily swipe allowance and premium entitlement.
#[derive(Clone)]
pub struct QuotaService {
    repo: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
}

impl QuotaService {
    pub fn new(repo: Arc<dyn Repository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Loads the swiper's profile and fails unless another swipe is allowed
    /// today. A lapsed premium is demoted as a side effect and the swipe is
    /// still rejected.
    pub async fn check_quota(&self, profile_id: Uuid) -> AppResult<Profile> {
        let now = self.clock.now();
        let profile = self
            .repo
            .find_profile(profile_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

        let needs_count = !profile.is_premium && !profile.has_unlimited_swipes();
        let decided_today = if needs_count {
            self.repo.count_decided(profile.id, now.date_naive()).await?
        } else {
            0
        };

        match evaluate_quota(&profile, decided_today, now) {
            QuotaDecision::Allowed => Ok(profile),
            QuotaDecision::PremiumExpired => {
                self.repo
                    .demote_premium(profile.id, DEFAULT_DAILY_SWIPE_QUOTA, now)
                    .await?;
                counter!("premium_demotions_total").increment(1);
                tracing::info!(profile_id = %profile.id, "premium membership lapsed, profile demoted");
                Err(AppError::new(ErrorCode::PremiumExpired, "premium membership expired"))
            }
            QuotaDecision::Exhausted { used, quota } => {
                tracing::debug!(profile_id = %profile.id, used, quota, "daily swipe quota reached");
                Err(AppError::new(ErrorCode::QuotaExceeded, "daily swipes quota exceed"))
            }
        }
    }

    /// What `show_profile` reports as today's remaining swipes.
    pub async fn remaining_for(&self, profile: &Profile) -> AppResult<i32> {
        if profile.has_unlimited_swipes() {
            return Ok(UNLIMITED_QUOTA);
        }
        let decided_today = self
            .repo
            .count_decided(profile.id, self.clock.now().date_naive())
            .await?;
        Ok(remaining_quota(profile, decided_today))
    }
}
