use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::clock::Clock;
use crate::models::{Gender, OnboardingStep, Profile};
use crate::repository::{ProfileChanges, Repository};
use crate::storage::{PhotoStore, PhotoUpload};

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_PHOTO_TYPES: &[&str] = &["image/jpeg", "image/png"];

static COORDINATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("COORDINATE_RE should compile"));

#[derive(Debug, Clone, Deserialize)]
pub struct PersonalInfoRequest {
    pub name: String,
    /// RFC 3339 timestamp.
    pub birth_date: String,
    pub gender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HobbyAndInterestRequest {
    pub hobby: Vec<String>,
    pub interest: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationRequest {
    pub longitude: String,
    pub latitude: String,
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::new(ErrorCode::ValidationError, message)
}

fn parse_personal_info(req: &PersonalInfoRequest, now: DateTime<Utc>) -> AppResult<ProfileChanges> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(invalid("name is required"));
    }
    let birth_date = DateTime::parse_from_rfc3339(req.birth_date.trim())
        .map_err(|_| invalid("invalid birth_date format, expected RFC 3339"))?
        .with_timezone(&Utc);
    if birth_date >= now {
        return Err(invalid("birth_date must be in the past"));
    }
    let gender = Gender::parse_loose(&req.gender).ok_or_else(|| invalid("gender must be male or female"))?;

    Ok(ProfileChanges::PersonalInfo { name: name.to_string(), birth_date, gender })
}

/// Trims entries and drops duplicates, keeping first occurrence order.
fn clean_list(field: &str, raw: &[String]) -> AppResult<Vec<String>> {
    if raw.is_empty() {
        return Err(invalid(format!("{field} is required")));
    }
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(invalid(format!("{field} must not contain empty entries")));
        }
        if !out.iter().any(|e| e == entry) {
            out.push(entry.to_string());
        }
    }
    Ok(out)
}

fn parse_coordinate(field: &str, raw: &str, bound: f64) -> AppResult<f64> {
    let raw = raw.trim();
    if !COORDINATE_RE.is_match(raw) {
        return Err(invalid(format!("{field} must be a decimal number")));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| invalid(format!("{field} must be a decimal number")))?;
    if !(-bound..=bound).contains(&value) {
        return Err(invalid(format!("{field} must be between -{bound} and {bound}")));
    }
    Ok(value)
}

fn check_photo(photo: &PhotoUpload) -> AppResult<()> {
    if !ALLOWED_PHOTO_TYPES.contains(&photo.content_type.as_str()) {
        return Err(AppError::new(
            ErrorCode::PhotoUploadFailed,
            "unsupported image format, accepted: jpeg, png",
        ));
    }
    if photo.bytes.len() > MAX_PHOTO_BYTES {
        return Err(AppError::new(ErrorCode::PayloadTooLarge, "photo exceeds 5 MiB"));
    }
    Ok(())
}

/// Fills in a profile one step at a time.
#[derive(Clone)]
pub struct OnboardingService {
    repo: Arc<dyn Repository>,
    photos: Arc<dyn PhotoStore>,
    clock: Arc<dyn Clock>,
}

impl OnboardingService {
    pub fn new(repo: Arc<dyn Repository>, photos: Arc<dyn PhotoStore>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, photos, clock }
    }

    pub async fn update_personal_info(&self, user_id: Uuid, req: PersonalInfoRequest) -> AppResult<()> {
        let changes = parse_personal_info(&req, self.clock.now())?;
        self.apply(user_id, OnboardingStep::PersonalInfo, changes).await
    }

    pub async fn update_photos(&self, user_id: Uuid, uploads: Vec<PhotoUpload>) -> AppResult<Vec<String>> {
        if uploads.is_empty() {
            return Err(invalid("at least one photo is required"));
        }
        for photo in &uploads {
            check_photo(photo)?;
        }

        let profile = self.profile_of(user_id).await?;
        let urls = self.photos.replace_all(profile.id, uploads).await?;
        self.apply_to(&profile, OnboardingStep::Photos, ProfileChanges::Photos(urls.clone()))
            .await?;
        Ok(urls)
    }

    pub async fn update_hobby_and_interest(&self, user_id: Uuid, req: HobbyAndInterestRequest) -> AppResult<()> {
        let changes = ProfileChanges::HobbyAndInterest {
            hobby: clean_list("hobby", &req.hobby)?,
            interest: clean_list("interest", &req.interest)?,
        };
        self.apply(user_id, OnboardingStep::HobbyAndInterest, changes).await
    }

    pub async fn update_location(&self, user_id: Uuid, req: LocationRequest) -> AppResult<()> {
        let changes = ProfileChanges::Location {
            longitude: parse_coordinate("longitude", &req.longitude, 180.0)?,
            latitude: parse_coordinate("latitude", &req.latitude, 90.0)?,
        };
        self.apply(user_id, OnboardingStep::Location, changes).await
    }

    async fn profile_of(&self, user_id: Uuid) -> AppResult<Profile> {
        self.repo
            .find_profile_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
    }

    async fn apply(&self, user_id: Uuid, step: OnboardingStep, changes: ProfileChanges) -> AppResult<()> {
        let profile = self.profile_of(user_id).await?;
        self.apply_to(&profile, step, changes).await
    }

    /// Writes `changes` and flips `step` to done when it is still pending.
    async fn apply_to(&self, profile: &Profile, step: OnboardingStep, changes: ProfileChanges) -> AppResult<()> {
        let user = self
            .repo
            .find_user(profile.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;

        let mut steps = user.onboarding_steps;
        let advanced = steps.mark_done(step);

        self.repo
            .apply_onboarding(profile.id, &changes, user.id, advanced.then_some(&steps), self.clock.now())
            .await?;

        tracing::info!(user_id = %user.id, profile_id = %profile.id, step = %step, advanced, "onboarding step saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StepStatus, User};
    use crate::testing::{t0, FixedClock, MemoryPhotoStore, MemoryRepository};

    struct Harness {
        repo: Arc<MemoryRepository>,
        photos: Arc<MemoryPhotoStore>,
        onboarding: OnboardingService,
        user: User,
        profile: Profile,
    }

    fn harness() -> Harness {
        let repo = Arc::new(MemoryRepository::default());
        let photos = Arc::new(MemoryPhotoStore::default());
        let user = repo.insert_user(User::register("a@x.com", t0()));
        let profile = repo.insert_profile(Profile::blank(user.id, t0()));
        let onboarding = OnboardingService::new(repo.clone(), photos.clone(), Arc::new(FixedClock::at(t0())));
        Harness { repo, photos, onboarding, user, profile }
    }

    fn personal(birth_date: &str, gender: &str) -> PersonalInfoRequest {
        PersonalInfoRequest { name: "Sekar".into(), birth_date: birth_date.into(), gender: gender.into() }
    }

    fn jpeg(size: usize) -> PhotoUpload {
        PhotoUpload { content_type: "image/jpeg".into(), bytes: vec![0; size] }
    }

    fn step_status(h: &Harness, step: OnboardingStep) -> Option<StepStatus> {
        h.repo.user_by_email("a@x.com").onboarding_steps.status_of(step)
    }

    #[tokio::test]
    async fn personal_info_is_normalized_and_marks_step() {
        let h = harness();
        h.onboarding
            .update_personal_info(h.user.id, personal("1997-02-14T00:00:00Z", "FEMALE"))
            .await
            .unwrap();

        let profile = h.repo.profile(h.profile.id);
        assert_eq!(profile.name.as_deref(), Some("Sekar"));
        assert_eq!(profile.gender, Some(Gender::Female));
        assert_eq!(step_status(&h, OnboardingStep::PersonalInfo), Some(StepStatus::Done));
        assert_eq!(step_status(&h, OnboardingStep::Photos), Some(StepStatus::Pending));
    }

    #[tokio::test]
    async fn personal_info_rejections() {
        let h = harness();
        for req in [
            personal("14/02/1997", "male"),
            personal("2030-01-01T00:00:00Z", "male"),
            personal("1997-02-14T00:00:00Z", "robot"),
            PersonalInfoRequest { name: "  ".into(), ..personal("1997-02-14T00:00:00Z", "male") },
        ] {
            let err = h.onboarding.update_personal_info(h.user.id, req).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::ValidationError);
        }
        assert_eq!(step_status(&h, OnboardingStep::PersonalInfo), Some(StepStatus::Pending));
    }

    #[tokio::test]
    async fn photos_replace_previous_set() {
        let h = harness();
        let urls = h
            .onboarding
            .update_photos(h.user.id, vec![jpeg(10), jpeg(20)])
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);

        let urls = h.onboarding.update_photos(h.user.id, vec![jpeg(10)]).await.unwrap();
        assert_eq!(h.photos.stored(h.profile.id), urls);
        assert_eq!(h.repo.profile(h.profile.id).photos, urls);
        assert_eq!(step_status(&h, OnboardingStep::Photos), Some(StepStatus::Done));
    }

    #[tokio::test]
    async fn photo_checks() {
        let h = harness();
        let err = h.onboarding.update_photos(h.user.id, vec![]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let gif = PhotoUpload { content_type: "image/gif".into(), ..jpeg(10) };
        let err = h.onboarding.update_photos(h.user.id, vec![jpeg(10), gif]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PhotoUploadFailed);

        let err = h
            .onboarding
            .update_photos(h.user.id, vec![jpeg(MAX_PHOTO_BYTES + 1)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PayloadTooLarge);

        assert!(h.photos.stored(h.profile.id).is_empty());
        assert!(h.onboarding.update_photos(h.user.id, vec![jpeg(MAX_PHOTO_BYTES)]).await.is_ok());
    }

    #[tokio::test]
    async fn hobbies_are_trimmed_and_deduplicated() {
        let h = harness();
        let req = HobbyAndInterestRequest {
            hobby: vec![" hiking".into(), "hiking ".into(), "chess".into()],
            interest: vec!["jazz".into()],
        };
        h.onboarding.update_hobby_and_interest(h.user.id, req).await.unwrap();

        let profile = h.repo.profile(h.profile.id);
        assert_eq!(profile.hobby, vec!["hiking".to_string(), "chess".to_string()]);
        assert_eq!(profile.interest, vec!["jazz".to_string()]);

        let req = HobbyAndInterestRequest { hobby: vec!["".into()], interest: vec!["jazz".into()] };
        let err = h.onboarding.update_hobby_and_interest(h.user.id, req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn location_bounds_and_format() {
        let h = harness();
        let at = |lon: &str, lat: &str| LocationRequest { longitude: lon.into(), latitude: lat.into() };

        h.onboarding.update_location(h.user.id, at("110.37", "-7.8")).await.unwrap();
        let profile = h.repo.profile(h.profile.id);
        assert_eq!(profile.longitude, Some(110.37));
        assert_eq!(profile.latitude, Some(-7.8));
        assert_eq!(step_status(&h, OnboardingStep::Location), Some(StepStatus::Done));

        for (lon, lat) in [("181", "0"), ("0", "-90.5"), ("1e2", "0"), ("abc", "0"), ("10.", "0")] {
            let err = h.onboarding.update_location(h.user.id, at(lon, lat)).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::ValidationError, "{lon},{lat}");
        }
    }

    #[tokio::test]
    async fn done_step_stays_done_on_rewrite() {
        let h = harness();
        let req = || LocationRequest { longitude: "1".into(), latitude: "2".into() };
        h.onboarding.update_location(h.user.id, req()).await.unwrap();
        h.onboarding.update_location(h.user.id, req()).await.unwrap();
        assert_eq!(step_status(&h, OnboardingStep::Location), Some(StepStatus::Done));
    }

    #[tokio::test]
    async fn missing_profile() {
        let h = harness();
        let err = h
            .onboarding
            .update_location(Uuid::now_v7(), LocationRequest { longitude: "1".into(), latitude: "2".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProfileNotFound);
    }
}
