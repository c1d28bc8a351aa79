use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use amora_shared::clients::db::{DbConn, DbPool};
use amora_shared::errors::{AppError, AppResult, ErrorCode};

use super::{
    OtpRepository, PaymentRepository, ProfileChanges, ProfileRepository, SwipeRepository, UserRepository,
};
use crate::models::{
    OnboardingSteps, OtpLog, OtpStatus, OtpType, Payment, PremiumGrant, Profile, Swipe, User, UserStatus,
};
use crate::schema::{one_time_password_logs, payments, profiles, swipes, users};

diesel::define_sql_function!(fn random() -> diesel::sql_types::Double);

/// Diesel/r2d2 implementation of every repository trait.
#[derive(Clone)]
pub struct PgRepository {
    pool: DbPool,
}

impl PgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> AppResult<DbConn> {
        self.pool
            .get()
            .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("database pool unavailable")))
    }

    pub fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}

/// Complete profiles other than the swiper that the swiper has not been
/// shown or decided on during `day`.
fn eligible_profiles(swiper_id: Uuid, day: NaiveDate, now: DateTime<Utc>) -> profiles::BoxedQuery<'static, Pg> {
    let seen_today = swipes::table
        .filter(swipes::swiper_id.eq(swiper_id))
        .filter(swipes::swiped_on.eq(day))
        .select(swipes::swiped_id);

    profiles::table
        .into_boxed()
        .filter(profiles::id.ne(swiper_id))
        .filter(profiles::id.ne_all(seen_today))
        .filter(profiles::name.ne(""))
        .filter(profiles::birth_date.lt(now))
        .filter(profiles::gender.is_not_null())
        .filter(profiles::photos.ne(Vec::<String>::new()))
        .filter(profiles::hobby.ne(Vec::<String>::new()))
        .filter(profiles::interest.ne(Vec::<String>::new()))
        .filter(profiles::longitude.is_not_null())
        .filter(profiles::latitude.is_not_null())
}

/// Another request stored a live code for the same user between our
/// supersede and insert.
fn otp_pending() -> AppError {
    AppError::new(ErrorCode::OtpPending, "otp already sent")
}

fn is_unique_violation(err: &AppError) -> bool {
    matches!(
        err,
        AppError::Database(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
    )
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let mut conn = self.conn()?;
        let user = users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let mut conn = self.conn()?;
        let user = users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    async fn find_or_create_user(&self, candidate: &User) -> AppResult<User> {
        let mut conn = self.conn()?;

        let inserted = diesel::insert_into(users::table)
            .values(candidate)
            .on_conflict(users::email)
            .do_nothing()
            .execute(&mut conn)?;

        let user = users::table
            .filter(users::email.eq(&candidate.email))
            .select(User::as_select())
            .first(&mut conn)?;

        if inserted > 0 {
            tracing::info!(user_id = %user.id, "user registered");
        }
        Ok(user)
    }

    async fn activate_user(&self, user_id: Uuid, profile: &Profile, now: DateTime<Utc>) -> AppResult<Profile> {
        let mut conn = self.conn()?;

        conn.transaction::<_, AppError, _>(|conn| {
            diesel::update(users::table.find(user_id))
                .set((users::status.eq(UserStatus::Active), users::updated_at.eq(now)))
                .execute(conn)?;

            diesel::insert_into(profiles::table)
                .values(profile)
                .on_conflict(profiles::user_id)
                .do_nothing()
                .execute(conn)?;

            let stored = profiles::table
                .filter(profiles::user_id.eq(user_id))
                .select(Profile::as_select())
                .first(conn)?;
            Ok(stored)
        })
    }
}

#[async_trait]
impl ProfileRepository for PgRepository {
    async fn find_profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;
        let profile = profiles::table
            .find(id)
            .select(Profile::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(profile)
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;
        let profile = profiles::table
            .filter(profiles::user_id.eq(user_id))
            .select(Profile::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(profile)
    }

    async fn apply_onboarding(
        &self,
        profile_id: Uuid,
        changes: &ProfileChanges,
        user_id: Uuid,
        steps: Option<&OnboardingSteps>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut conn = self.conn()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let target = profiles::table.find(profile_id);
            let updated = match changes {
                ProfileChanges::PersonalInfo { name, birth_date, gender } => diesel::update(target)
                    .set((
                        profiles::name.eq(name.as_str()),
                        profiles::birth_date.eq(*birth_date),
                        profiles::gender.eq(*gender),
                        profiles::updated_at.eq(now),
                    ))
                    .execute(conn)?,
                ProfileChanges::Photos(photos) => diesel::update(target)
                    .set((profiles::photos.eq(photos), profiles::updated_at.eq(now)))
                    .execute(conn)?,
                ProfileChanges::HobbyAndInterest { hobby, interest } => diesel::update(target)
                    .set((
                        profiles::hobby.eq(hobby),
                        profiles::interest.eq(interest),
                        profiles::updated_at.eq(now),
                    ))
                    .execute(conn)?,
                ProfileChanges::Location { longitude, latitude } => diesel::update(target)
                    .set((
                        profiles::longitude.eq(*longitude),
                        profiles::latitude.eq(*latitude),
                        profiles::updated_at.eq(now),
                    ))
                    .execute(conn)?,
            };

            if updated == 0 {
                return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
            }

            if let Some(steps) = steps {
                diesel::update(users::table.find(user_id))
                    .set((users::onboarding_steps.eq(steps), users::updated_at.eq(now)))
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    async fn demote_premium(&self, profile_id: Uuid, daily_swipe_quota: i32, now: DateTime<Utc>) -> AppResult<Profile> {
        let mut conn = self.conn()?;
        let profile = diesel::update(profiles::table.find(profile_id))
            .set((
                profiles::is_premium.eq(false),
                profiles::premium_valid_until.eq(None::<DateTime<Utc>>),
                profiles::daily_swipe_quota.eq(daily_swipe_quota),
                profiles::updated_at.eq(now),
            ))
            .returning(Profile::as_returning())
            .get_result(&mut conn)?;
        Ok(profile)
    }

    async fn random_candidate(
        &self,
        swiper_id: Uuid,
        exclude: &[Uuid],
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;

        let mut query = eligible_profiles(swiper_id, day, now);
        if !exclude.is_empty() {
            query = query.filter(profiles::id.ne_all(exclude.to_vec()));
        }

        // ORDER BY random() scans every eligible row; fine at current table sizes.
        let candidate = query
            .order(random())
            .first::<Profile>(&mut conn)
            .optional()?;
        Ok(candidate)
    }

    async fn eligible_candidate(
        &self,
        swiper_id: Uuid,
        candidate_id: Uuid,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;
        let candidate = eligible_profiles(swiper_id, day, now)
            .filter(profiles::id.eq(candidate_id))
            .first::<Profile>(&mut conn)
            .optional()?;
        Ok(candidate)
    }
}

#[async_trait]
impl OtpRepository for PgRepository {
    async fn count_otp_between(
        &self,
        user_id: Uuid,
        otp_type: OtpType,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<i64> {
        let mut conn = self.conn()?;
        let count = one_time_password_logs::table
            .filter(one_time_password_logs::user_id.eq(user_id))
            .filter(one_time_password_logs::otp_type.eq(otp_type))
            .filter(one_time_password_logs::created_at.between(since, until))
            .count()
            .get_result(&mut conn)?;
        Ok(count)
    }

    async fn latest_otp(&self, user_id: Uuid, otp_type: OtpType) -> AppResult<Option<OtpLog>> {
        let mut conn = self.conn()?;
        let log = one_time_password_logs::table
            .filter(one_time_password_logs::user_id.eq(user_id))
            .filter(one_time_password_logs::otp_type.eq(otp_type))
            .order(one_time_password_logs::created_at.desc())
            .select(OtpLog::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(log)
    }

    async fn create_otp(&self, log: &OtpLog) -> AppResult<OtpLog> {
        let mut conn = self.conn()?;

        let result = conn.transaction::<_, AppError, _>(|conn| {
            let expired = diesel::update(
                one_time_password_logs::table
                    .filter(one_time_password_logs::user_id.eq(log.user_id))
                    .filter(one_time_password_logs::otp_type.eq(log.otp_type))
                    .filter(one_time_password_logs::status.eq(OtpStatus::Unused)),
            )
            .set((
                one_time_password_logs::status.eq(OtpStatus::Expired),
                one_time_password_logs::updated_at.eq(log.created_at),
            ))
            .execute(conn)?;

            if expired > 0 {
                tracing::debug!(user_id = %log.user_id, expired, "superseded unused otp codes");
            }

            let stored = diesel::insert_into(one_time_password_logs::table)
                .values(log)
                .returning(OtpLog::as_returning())
                .get_result(conn)?;
            Ok(stored)
        });

        match result {
            Err(e) if is_unique_violation(&e) => Err(otp_pending()),
            other => other,
        }
    }

    async fn update_otp(
        &self,
        id: Uuid,
        status: OtpStatus,
        remaining_attempts: i32,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::update(one_time_password_logs::table.find(id))
            .set((
                one_time_password_logs::status.eq(status),
                one_time_password_logs::remaining_attempts.eq(remaining_attempts),
                one_time_password_logs::updated_at.eq(now),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}

#[async_trait]
impl SwipeRepository for PgRepository {
    async fn count_decided(&self, swiper_id: Uuid, day: NaiveDate) -> AppResult<i64> {
        let mut conn = self.conn()?;
        let count = swipes::table
            .filter(swipes::swiper_id.eq(swiper_id))
            .filter(swipes::swiped_on.eq(day))
            .filter(swipes::is_like.is_not_null())
            .count()
            .get_result(&mut conn)?;
        Ok(count)
    }

    async fn find_decided(&self, swiper_id: Uuid, swiped_id: Uuid, day: NaiveDate) -> AppResult<Option<Swipe>> {
        let mut conn = self.conn()?;
        let swipe = swipes::table
            .filter(swipes::swiper_id.eq(swiper_id))
            .filter(swipes::swiped_id.eq(swiped_id))
            .filter(swipes::swiped_on.eq(day))
            .filter(swipes::is_like.is_not_null())
            .select(Swipe::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(swipe)
    }

    async fn record_shown(&self, swipe: &Swipe) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(swipes::table)
            .values(swipe)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn record_decision(&self, swipe: &Swipe) -> AppResult<Swipe> {
        let mut conn = self.conn()?;

        let result = conn.transaction::<_, AppError, _>(|conn| {
            diesel::delete(
                swipes::table
                    .filter(swipes::swiper_id.eq(swipe.swiper_id))
                    .filter(swipes::swiped_id.eq(swipe.swiped_id))
                    .filter(swipes::swiped_on.eq(swipe.swiped_on))
                    .filter(swipes::is_like.is_null()),
            )
            .execute(conn)?;

            let stored = diesel::insert_into(swipes::table)
                .values(swipe)
                .returning(Swipe::as_returning())
                .get_result(conn)?;
            Ok(stored)
        });

        match result {
            Err(e) if is_unique_violation(&e) => Err(AppError::new(
                ErrorCode::AlreadySwiped,
                "already swiped today",
            )),
            other => other,
        }
    }
}

#[async_trait]
impl PaymentRepository for PgRepository {
    async fn record_payment(&self, payment: &Payment, profile_id: Uuid, grant: PremiumGrant) -> AppResult<Payment> {
        let mut conn = self.conn()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let stored = diesel::insert_into(payments::table)
                .values(payment)
                .returning(Payment::as_returning())
                .get_result(conn)?;

            let granted = diesel::update(profiles::table.find(profile_id))
                .set((
                    profiles::is_premium.eq(true),
                    profiles::premium_valid_until.eq(grant.valid_until),
                    profiles::daily_swipe_quota.eq(grant.daily_swipe_quota),
                    profiles::updated_at.eq(payment.created_at),
                ))
                .execute(conn)?;

            if granted == 0 {
                return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
            }
            Ok(stored)
        })
    }
}
