//! Persistence port. Services only ever see these traits; `postgres`
//! provides the diesel-backed implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use amora_shared::errors::AppResult;

use crate::models::{
    Gender, OnboardingSteps, OtpLog, OtpStatus, OtpType, Payment, PremiumGrant, Profile, Swipe, User,
};

pub mod postgres;

pub use postgres::PgRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Inserts `candidate` unless a user with the same email exists, and
    /// returns whichever row ends up stored.
    async fn find_or_create_user(&self, candidate: &User) -> AppResult<User>;

    /// Marks the user ACTIVE and creates their profile in one unit of work.
    /// Returns the stored profile (an existing one if activation raced).
    async fn activate_user(&self, user_id: Uuid, profile: &Profile, now: DateTime<Utc>) -> AppResult<Profile>;
}

/// A single onboarding write against a profile.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileChanges {
    PersonalInfo {
        name: String,
        birth_date: DateTime<Utc>,
        gender: Gender,
    },
    Photos(Vec<String>),
    HobbyAndInterest {
        hobby: Vec<String>,
        interest: Vec<String>,
    },
    Location {
        longitude: f64,
        latitude: f64,
    },
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, id: Uuid) -> AppResult<Option<Profile>>;

    async fn find_profile_by_user(&self, user_id: Uuid) -> AppResult<Option<Profile>>;

    /// Applies `changes` and, when given, the user's new onboarding steps
    /// atomically.
    async fn apply_onboarding(
        &self,
        profile_id: Uuid,
        changes: &ProfileChanges,
        user_id: Uuid,
        steps: Option<&OnboardingSteps>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Clears premium state and restores `daily_swipe_quota`.
    async fn demote_premium(&self, profile_id: Uuid, daily_swipe_quota: i32, now: DateTime<Utc>) -> AppResult<Profile>;

    /// A uniformly random complete profile the swiper has not seen on `day`,
    /// skipping the swiper and every id in `exclude`.
    async fn random_candidate(
        &self,
        swiper_id: Uuid,
        exclude: &[Uuid],
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Profile>>;

    /// `candidate_id` if it is complete, not the swiper, and unseen on `day`.
    async fn eligible_candidate(
        &self,
        swiper_id: Uuid,
        candidate_id: Uuid,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Profile>>;
}

#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Logs of `otp_type` for the user created within `[since, until]`.
    async fn count_otp_between(
        &self,
        user_id: Uuid,
        otp_type: OtpType,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<i64>;

    async fn latest_otp(&self, user_id: Uuid, otp_type: OtpType) -> AppResult<Option<OtpLog>>;

    /// Expires the user's live codes of the same type, then stores `log`.
    /// Losing a race against a concurrent insert surfaces as `OtpPending`.
    async fn create_otp(&self, log: &OtpLog) -> AppResult<OtpLog>;

    async fn update_otp(
        &self,
        id: Uuid,
        status: OtpStatus,
        remaining_attempts: i32,
        now: DateTime<Utc>,
    ) -> AppResult<()>;
}

#[async_trait]
pub trait SwipeRepository: Send + Sync {
    async fn count_decided(&self, swiper_id: Uuid, day: NaiveDate) -> AppResult<i64>;

    async fn find_decided(&self, swiper_id: Uuid, swiped_id: Uuid, day: NaiveDate) -> AppResult<Option<Swipe>>;

    /// Stores a shown-only marker (`is_like` unset).
    async fn record_shown(&self, swipe: &Swipe) -> AppResult<()>;

    /// Replaces the pair's shown-only marker for the day with the decided
    /// swipe. A concurrent duplicate decision surfaces as `AlreadySwiped`.
    async fn record_decision(&self, swipe: &Swipe) -> AppResult<Swipe>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Stores the payment and grants premium on the profile atomically.
    async fn record_payment(&self, payment: &Payment, profile_id: Uuid, grant: PremiumGrant) -> AppResult<Payment>;
}

/// Everything the services need from storage.
pub trait Repository:
    UserRepository + ProfileRepository + OtpRepository + SwipeRepository + PaymentRepository
{
}

impl<T> Repository for T where
    T: UserRepository + ProfileRepository + OtpRepository + SwipeRepository + PaymentRepository
{
}
