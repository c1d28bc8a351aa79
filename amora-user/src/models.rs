use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::schema::{one_time_password_logs, payments, profiles, swipes, users};

pub const DEFAULT_DAILY_SWIPE_QUOTA: i32 = 10;
/// Quota value meaning "no daily limit" (premium members).
pub const UNLIMITED_QUOTA: i32 = -1;

/// Closed set of string-valued states stored in `VARCHAR` columns.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsExpression, FromSqlRow)]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {}: {other}", stringify!($name))),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = std::str::from_utf8(bytes.as_bytes())?;
                Ok(raw.parse()?)
            }
        }
    };
}

text_enum!(UserStatus {
    Unverified => "UNVERIFIED",
    Active => "ACTIVE",
    Deactive => "DEACTIVE",
});

text_enum!(OtpType {
    Email => "EMAIL",
    Sms => "SMS",
    PhoneCall => "PHONE_CALL",
    Whatsapp => "WHATSAPP",
});

text_enum!(
    /// `Unused` is the only live state; `Used` and `Expired` are terminal.
    OtpStatus {
        Unused => "UNUSED",
        Used => "USED",
        Expired => "EXPIRED",
    }
);

text_enum!(Gender {
    Male => "Male",
    Female => "Female",
});

text_enum!(PaymentStatus {
    Pending => "PENDING",
    Success => "SUCCESS",
    Failed => "FAILED",
    Expired => "EXPIRED",
});

text_enum!(PaymentMethod {
    VirtualAccount => "Virtual Account",
    CreditCard => "Credit Card",
    BankTransfer => "Bank Transfer",
    EWallet => "e-Wallet",
    GoogleWallet => "Google Wallet",
});

text_enum!(OnboardingStep {
    PersonalInfo => "personal-info",
    Photos => "photos",
    HobbyAndInterest => "hobby-and-interest",
    Location => "location",
});

text_enum!(StepStatus {
    Pending => "pending",
    Done => "done",
});

impl Gender {
    /// Case-insensitive match on `male` / `female`.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl PaymentMethod {
    pub fn parse_loose(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

// --- Onboarding steps ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    pub step: OnboardingStep,
    pub status: StepStatus,
}

/// Ordered onboarding progress, persisted as `step:status` pairs joined by
/// commas (`personal-info:done,photos:pending`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(transparent)]
pub struct OnboardingSteps(Vec<StepState>);

impl Default for OnboardingSteps {
    fn default() -> Self {
        Self(
            OnboardingStep::ALL
                .iter()
                .map(|&step| StepState { step, status: StepStatus::Pending })
                .collect(),
        )
    }
}

impl OnboardingSteps {
    /// Lenient parse: malformed or unknown entries are dropped.
    pub fn parse(raw: &str) -> Self {
        let steps = raw
            .split(',')
            .filter_map(|entry| {
                let (step, status) = entry.trim().split_once(':')?;
                Some(StepState {
                    step: step.parse().ok()?,
                    status: status.parse().ok()?,
                })
            })
            .collect();
        Self(steps)
    }

    pub fn steps(&self) -> &[StepState] {
        &self.0
    }

    pub fn status_of(&self, step: OnboardingStep) -> Option<StepStatus> {
        self.0.iter().find(|s| s.step == step).map(|s| s.status)
    }

    /// Flips a pending step to done. Returns whether anything changed.
    pub fn mark_done(&mut self, step: OnboardingStep) -> bool {
        match self.0.iter_mut().find(|s| s.step == step) {
            Some(state) if state.status == StepStatus::Pending => {
                state.status = StepStatus::Done;
                true
            }
            _ => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.0.iter().all(|s| s.status == StepStatus::Done)
    }
}

impl fmt::Display for OnboardingSteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, state) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", state.step, state.status)?;
        }
        Ok(())
    }
}

impl ToSql<Text, Pg> for OnboardingSteps {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.to_string().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for OnboardingSteps {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        Ok(Self::parse(std::str::from_utf8(bytes.as_bytes())?))
    }
}

// --- User ---

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub status: UserStatus,
    pub onboarding_steps: OnboardingSteps,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// A fresh, unverified account with every onboarding step pending.
    pub fn register(email: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: email.to_string(),
            phone: None,
            status: UserStatus::Unverified,
            onboarding_steps: OnboardingSteps::default(),
            created_at: now,
            updated_at: None,
        }
    }
}

// --- Profile ---

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = profiles)]
#[diesel(check_for_backend(Pg))]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub gender: Option<Gender>,
    pub photos: Vec<String>,
    pub hobby: Vec<String>,
    pub interest: Vec<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub is_premium: bool,
    pub premium_valid_until: Option<DateTime<Utc>>,
    pub daily_swipe_quota: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn blank(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            name: None,
            birth_date: None,
            gender: None,
            photos: Vec::new(),
            hobby: Vec::new(),
            interest: Vec::new(),
            longitude: None,
            latitude: None,
            is_premium: false,
            premium_valid_until: None,
            daily_swipe_quota: DEFAULT_DAILY_SWIPE_QUOTA,
            created_at: now,
            updated_at: None,
        }
    }

    /// Complete profiles are the only ones ever shown in a feed.
    pub fn is_complete(&self, now: DateTime<Utc>) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
            && self.birth_date.is_some_and(|b| b < now)
            && self.gender.is_some()
            && !self.photos.is_empty()
            && !self.hobby.is_empty()
            && !self.interest.is_empty()
            && self.longitude.is_some()
            && self.latitude.is_some()
    }

    pub fn has_unlimited_swipes(&self) -> bool {
        self.daily_swipe_quota < 0
    }

    pub fn location(&self) -> Option<Location> {
        Some(Location::new(self.longitude?, self.latitude?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
    pub url: String,
}

impl Location {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            url: format!("https://www.google.com/maps?q={latitude},{longitude}"),
        }
    }
}

/// Profile as rendered to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub gender: Option<Gender>,
    pub photos: Vec<String>,
    pub hobby: Vec<String>,
    pub interest: Vec<String>,
    pub location: Option<Location>,
    pub is_premium: bool,
    pub premium_valid_until: Option<DateTime<Utc>>,
    pub daily_swap_quota: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub email: String,
    pub status: UserStatus,
    pub onboarding_steps: OnboardingSteps,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            status: user.status,
            onboarding_steps: user.onboarding_steps.clone(),
        }
    }
}

impl From<&Profile> for ProfileView {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            name: p.name.clone(),
            birth_date: p.birth_date,
            gender: p.gender,
            photos: p.photos.clone(),
            hobby: p.hobby.clone(),
            interest: p.interest.clone(),
            location: p.location(),
            is_premium: p.is_premium,
            premium_valid_until: p.premium_valid_until,
            daily_swap_quota: p.daily_swipe_quota,
            created_at: p.created_at,
            updated_at: p.updated_at,
            user: None,
        }
    }
}

// --- One-time password log ---

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = one_time_password_logs)]
#[diesel(check_for_backend(Pg))]
pub struct OtpLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub otp_type: OtpType,
    pub code: String,
    pub status: OtpStatus,
    pub remaining_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OtpLog {
    pub fn issue(user_id: Uuid, otp_type: OtpType, code: String, attempts: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            otp_type,
            code,
            status: OtpStatus::Unused,
            remaining_attempts: attempts,
            created_at: now,
            updated_at: None,
        }
    }
}

// --- Swipe ---

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = swipes)]
#[diesel(check_for_backend(Pg))]
pub struct Swipe {
    pub id: Uuid,
    pub swiper_id: Uuid,
    pub swiped_id: Uuid,
    /// `None` marks a profile that was only shown, not decided on.
    pub is_like: Option<bool>,
    pub swiped_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Swipe {
    pub fn new(swiper_id: Uuid, swiped_id: Uuid, is_like: Option<bool>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            swiper_id,
            swiped_id,
            is_like,
            swiped_on: now.date_naive(),
            created_at: now,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.is_like.is_some()
    }
}

// --- Payment ---

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(Pg))]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub identifier: String,
    pub payment_method: PaymentMethod,
    pub payment_data: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Premium entitlement written together with a successful payment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PremiumGrant {
    pub valid_until: DateTime<Utc>,
    pub daily_swipe_quota: i32,
}
