use std::sync::Arc;

use metrics::counter;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::clock::Clock;
use crate::models::{Profile, Swipe};
use crate::repository::Repository;

/// Picks the next cards for a swiper's feed.
#[derive(Clone)]
pub struct FeedService {
    repo: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
}

impl FeedService {
    pub fn new(repo: Arc<dyn Repository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Returns one or two candidates. The first is either `focus` (which
    /// must itself be eligible) or a random eligible profile; the second is
    /// a best-effort random prefetch. The first pick is reserved for today
    /// with a shown-only swipe.
    pub async fn next_candidates(&self, swiper_id: Uuid, focus: Option<Uuid>) -> AppResult<Vec<Profile>> {
        let now = self.clock.now();
        let day = now.date_naive();

        let first = match focus {
            Some(candidate_id) => self
                .repo
                .eligible_candidate(swiper_id, candidate_id, day, now)
                .await?
                .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?,
            None => self
                .repo
                .random_candidate(swiper_id, &[], day, now)
                .await?
                .ok_or_else(|| AppError::new(ErrorCode::NoMoreProfiles, "no more profile to show"))?,
        };

        let second = self
            .repo
            .random_candidate(swiper_id, &[first.id], day, now)
            .await?;

        self.repo
            .record_shown(&Swipe::new(swiper_id, first.id, None, now))
            .await?;

        let mut candidates = vec![first];
        candidates.extend(second);

        counter!("feed_candidates_served_total").increment(candidates.len() as u64);
        tracing::debug!(swiper_id = %swiper_id, served = candidates.len(), "feed candidates selected");

        Ok(candidates)
    }
}
