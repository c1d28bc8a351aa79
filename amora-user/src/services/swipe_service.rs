use std::sync::Arc;

use metrics::counter;
use serde::Deserialize;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::AuthUser;

use crate::clock::Clock;
use crate::models::Swipe;
use crate::repository::Repository;
use crate::services::quota_service::QuotaService;

#[derive(Debug, Clone, Deserialize)]
pub struct SwipeRequest {
    #[serde(alias = "profile_id")]
    pub swiped_id: Uuid,
    pub is_like: bool,
}

#[derive(Clone)]
pub struct SwipeService {
    repo: Arc<dyn Repository>,
    quota: QuotaService,
    clock: Arc<dyn Clock>,
}

impl SwipeService {
    pub fn new(repo: Arc<dyn Repository>, quota: QuotaService, clock: Arc<dyn Clock>) -> Self {
        Self { repo, quota, clock }
    }

    /// Records a like or pass from the caller's profile.
    pub async fn swipe(&self, auth: &AuthUser, req: SwipeRequest) -> AppResult<Swipe> {
        let swiper_id = auth.profile_id;
        if swiper_id == req.swiped_id {
            return Err(AppError::new(ErrorCode::CannotSwipeSelf, "cannot swipe your own profile"));
        }

        self.repo
            .find_profile(req.swiped_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

        self.quota.check_quota(swiper_id).await?;

        let swipe = self.record_swipe(swiper_id, req.swiped_id, req.is_like).await?;

        let decision = if req.is_like { "like" } else { "pass" };
        counter!("swipes_total", "decision" => decision).increment(1);
        tracing::info!(swiper_id = %swiper_id, swiped_id = %req.swiped_id, decision, "swipe recorded");

        Ok(swipe)
    }

    /// One decided swipe per pair per day. A shown-only marker for the pair
    /// is replaced by the decision.
    pub async fn record_swipe(&self, swiper_id: Uuid, swiped_id: Uuid, is_like: bool) -> AppResult<Swipe> {
        let now = self.clock.now();
        if self
            .repo
            .find_decided(swiper_id, swiped_id, now.date_naive())
            .await?
            .is_some()
        {
            return Err(AppError::new(ErrorCode::AlreadySwiped, "already swiped today"));
        }
        self.repo
            .record_decision(&Swipe::new(swiper_id, swiped_id, Some(is_like), now))
            .await
    }
}
