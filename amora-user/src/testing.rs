//! In-memory doubles of every port, for service and route tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rand::seq::SliceRandom;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::clock::Clock;
use crate::mailer::{MailTemplate, Mailer};
use crate::models::{
    Gender, OnboardingSteps, OtpLog, OtpStatus, OtpType, Payment, PremiumGrant, Profile, Swipe, User, UserStatus,
};
use crate::repository::{
    OtpRepository, PaymentRepository, ProfileChanges, ProfileRepository, SwipeRepository, UserRepository,
};
use crate::session::SessionStore;
use crate::storage::{PhotoStore, PhotoUpload};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

/// A profile that satisfies every completeness rule.
pub fn complete_profile(now: DateTime<Utc>) -> Profile {
    let mut profile = Profile::blank(Uuid::now_v7(), now);
    profile.name = Some("Sekar".into());
    profile.birth_date = Some(now - Duration::days(365 * 27));
    profile.gender = Some(Gender::Female);
    profile.photos = vec!["https://cdn.amora.app/p/1.jpg".into()];
    profile.hobby = vec!["hiking".into()];
    profile.interest = vec!["jazz".into()];
    profile.longitude = Some(110.37);
    profile.latitude = Some(-7.8);
    profile
}

// --- Clock ---

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

// --- Repository ---

#[derive(Default)]
pub struct MemoryState {
    pub users: Vec<User>,
    pub profiles: Vec<Profile>,
    pub otps: Vec<OtpLog>,
    pub swipes: Vec<Swipe>,
    pub payments: Vec<Payment>,
    /// A code another request commits while the next `create_otp` runs.
    pub racing_otp: Option<OtpLog>,
}

impl MemoryState {
    fn profile_mut(&mut self, id: Uuid) -> AppResult<&mut Profile> {
        self.profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
    }

    fn is_eligible(&self, candidate: &Profile, swiper_id: Uuid, day: NaiveDate, now: DateTime<Utc>) -> bool {
        candidate.id != swiper_id
            && candidate.is_complete(now)
            && !self
                .swipes
                .iter()
                .any(|s| s.swiper_id == swiper_id && s.swiped_id == candidate.id && s.swiped_on == day)
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn insert_profile(&self, profile: Profile) -> Profile {
        self.state().profiles.push(profile.clone());
        profile
    }

    pub fn insert_user(&self, user: User) -> User {
        self.state().users.push(user.clone());
        user
    }

    pub fn profile(&self, id: Uuid) -> Profile {
        self.state().profiles.iter().find(|p| p.id == id).cloned().unwrap()
    }

    pub fn user_by_email(&self, email: &str) -> User {
        self.state().users.iter().find(|u| u.email == email).cloned().unwrap()
    }

    pub fn otps_for(&self, user_id: Uuid) -> Vec<OtpLog> {
        self.state().otps.iter().filter(|o| o.user_id == user_id).cloned().collect()
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.state().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_or_create_user(&self, candidate: &User) -> AppResult<User> {
        let mut state = self.state();
        if let Some(existing) = state.users.iter().find(|u| u.email == candidate.email) {
            return Ok(existing.clone());
        }
        state.users.push(candidate.clone());
        Ok(candidate.clone())
    }

    async fn activate_user(&self, user_id: Uuid, profile: &Profile, now: DateTime<Utc>) -> AppResult<Profile> {
        let mut state = self.state();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::not_found("user not found"))?;
        user.status = UserStatus::Active;
        user.updated_at = Some(now);

        if let Some(existing) = state.profiles.iter().find(|p| p.user_id == user_id) {
            return Ok(existing.clone());
        }
        state.profiles.push(profile.clone());
        Ok(profile.clone())
    }
}

#[async_trait]
impl ProfileRepository for MemoryRepository {
    async fn find_profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.state().profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.state().profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn apply_onboarding(
        &self,
        profile_id: Uuid,
        changes: &ProfileChanges,
        user_id: Uuid,
        steps: Option<&OnboardingSteps>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state();
        let profile = state.profile_mut(profile_id)?;
        match changes {
            ProfileChanges::PersonalInfo { name, birth_date, gender } => {
                profile.name = Some(name.clone());
                profile.birth_date = Some(*birth_date);
                profile.gender = Some(*gender);
            }
            ProfileChanges::Photos(photos) => profile.photos = photos.clone(),
            ProfileChanges::HobbyAndInterest { hobby, interest } => {
                profile.hobby = hobby.clone();
                profile.interest = interest.clone();
            }
            ProfileChanges::Location { longitude, latitude } => {
                profile.longitude = Some(*longitude);
                profile.latitude = Some(*latitude);
            }
        }
        profile.updated_at = Some(now);

        if let Some(steps) = steps {
            if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
                user.onboarding_steps = steps.clone();
                user.updated_at = Some(now);
            }
        }
        Ok(())
    }

    async fn demote_premium(&self, profile_id: Uuid, daily_swipe_quota: i32, now: DateTime<Utc>) -> AppResult<Profile> {
        let mut state = self.state();
        let profile = state.profile_mut(profile_id)?;
        profile.is_premium = false;
        profile.premium_valid_until = None;
        profile.daily_swipe_quota = daily_swipe_quota;
        profile.updated_at = Some(now);
        Ok(profile.clone())
    }

    async fn random_candidate(
        &self,
        swiper_id: Uuid,
        exclude: &[Uuid],
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Profile>> {
        let state = self.state();
        let eligible: Vec<&Profile> = state
            .profiles
            .iter()
            .filter(|p| !exclude.contains(&p.id) && state.is_eligible(p, swiper_id, day, now))
            .collect();
        Ok(eligible.choose(&mut rand::thread_rng()).map(|p| (*p).clone()))
    }

    async fn eligible_candidate(
        &self,
        swiper_id: Uuid,
        candidate_id: Uuid,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Profile>> {
        let state = self.state();
        Ok(state
            .profiles
            .iter()
            .find(|p| p.id == candidate_id && state.is_eligible(p, swiper_id, day, now))
            .cloned())
    }
}

#[async_trait]
impl OtpRepository for MemoryRepository {
    async fn count_otp_between(
        &self,
        user_id: Uuid,
        otp_type: OtpType,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count = self
            .state()
            .otps
            .iter()
            .filter(|o| o.user_id == user_id && o.otp_type == otp_type)
            .filter(|o| o.created_at >= since && o.created_at <= until)
            .count();
        Ok(count as i64)
    }

    async fn latest_otp(&self, user_id: Uuid, otp_type: OtpType) -> AppResult<Option<OtpLog>> {
        Ok(self
            .state()
            .otps
            .iter()
            .filter(|o| o.user_id == user_id && o.otp_type == otp_type)
            .max_by_key(|o| o.created_at)
            .cloned())
    }

    async fn create_otp(&self, log: &OtpLog) -> AppResult<OtpLog> {
        let mut state = self.state();
        for existing in state
            .otps
            .iter_mut()
            .filter(|o| o.user_id == log.user_id && o.otp_type == log.otp_type && o.status == OtpStatus::Unused)
        {
            existing.status = OtpStatus::Expired;
            existing.updated_at = Some(log.created_at);
        }
        if let Some(racer) = state.racing_otp.take() {
            state.otps.push(racer);
            return Err(AppError::new(ErrorCode::OtpPending, "otp already sent"));
        }
        state.otps.push(log.clone());
        Ok(log.clone())
    }

    async fn update_otp(
        &self,
        id: Uuid,
        status: OtpStatus,
        remaining_attempts: i32,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state();
        let log = state
            .otps
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| AppError::not_found("otp log not found"))?;
        log.status = status;
        log.remaining_attempts = remaining_attempts;
        log.updated_at = Some(now);
        Ok(())
    }
}

#[async_trait]
impl SwipeRepository for MemoryRepository {
    async fn count_decided(&self, swiper_id: Uuid, day: NaiveDate) -> AppResult<i64> {
        let count = self
            .state()
            .swipes
            .iter()
            .filter(|s| s.swiper_id == swiper_id && s.swiped_on == day && s.is_decided())
            .count();
        Ok(count as i64)
    }

    async fn find_decided(&self, swiper_id: Uuid, swiped_id: Uuid, day: NaiveDate) -> AppResult<Option<Swipe>> {
        Ok(self
            .state()
            .swipes
            .iter()
            .find(|s| s.swiper_id == swiper_id && s.swiped_id == swiped_id && s.swiped_on == day && s.is_decided())
            .cloned())
    }

    async fn record_shown(&self, swipe: &Swipe) -> AppResult<()> {
        self.state().swipes.push(swipe.clone());
        Ok(())
    }

    async fn record_decision(&self, swipe: &Swipe) -> AppResult<Swipe> {
        let mut state = self.state();
        let same_pair = |s: &Swipe| {
            s.swiper_id == swipe.swiper_id && s.swiped_id == swipe.swiped_id && s.swiped_on == swipe.swiped_on
        };
        if state.swipes.iter().any(|s| same_pair(s) && s.is_decided()) {
            return Err(AppError::new(ErrorCode::AlreadySwiped, "already swiped today"));
        }
        state.swipes.retain(|s| !(same_pair(s) && !s.is_decided()));
        state.swipes.push(swipe.clone());
        Ok(swipe.clone())
    }
}

#[async_trait]
impl PaymentRepository for MemoryRepository {
    async fn record_payment(&self, payment: &Payment, profile_id: Uuid, grant: PremiumGrant) -> AppResult<Payment> {
        let mut state = self.state();
        let profile = state.profile_mut(profile_id)?;
        profile.is_premium = true;
        profile.premium_valid_until = Some(grant.valid_until);
        profile.daily_swipe_quota = grant.daily_swipe_quota;
        profile.updated_at = Some(payment.created_at);
        state.payments.push(payment.clone());
        Ok(payment.clone())
    }
}

// --- Session store ---

#[derive(Default)]
pub struct MemorySessions {
    entries: Mutex<HashMap<String, (String, Duration)>>,
}

impl MemorySessions {
    pub fn entry(&self, key: &str) -> Option<(String, Duration)> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessions {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.entries.lock().unwrap().insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }

    async fn del(&self, key: &str) -> AppResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// --- Mailer ---

#[derive(Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<(String, MailTemplate)>>,
    fail: Mutex<bool>,
}

impl CapturingMailer {
    pub fn failing() -> Self {
        Self { sent: Mutex::default(), fail: Mutex::new(true) }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_code(&self, recipient: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == recipient)
            .map(|(_, template)| match template {
                MailTemplate::Login { code } => code.clone(),
            })
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, recipient: &str, template: MailTemplate) -> AppResult<()> {
        if *self.fail.lock().unwrap() {
            return Err(AppError::internal("smtp relay unavailable"));
        }
        self.sent.lock().unwrap().push((recipient.to_string(), template));
        Ok(())
    }
}

// --- Photo store ---

#[derive(Default)]
pub struct MemoryPhotoStore {
    objects: Mutex<HashMap<Uuid, Vec<String>>>,
}

impl MemoryPhotoStore {
    pub fn stored(&self, profile_id: Uuid) -> Vec<String> {
        self.objects.lock().unwrap().get(&profile_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn replace_all(&self, profile_id: Uuid, photos: Vec<PhotoUpload>) -> AppResult<Vec<String>> {
        let urls: Vec<String> = photos
            .iter()
            .enumerate()
            .map(|(i, p)| format!("memory://profiles/{profile_id}/{i}.{}", p.extension()))
            .collect();
        self.objects.lock().unwrap().insert(profile_id, urls.clone());
        Ok(urls)
    }
}
