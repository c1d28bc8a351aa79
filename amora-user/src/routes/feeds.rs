use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use amora_shared::errors::AppResult;
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::models::{ProfileView, Swipe};
use crate::services::swipe_service::SwipeRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub profile_id: Option<Uuid>,
}

pub async fn show_feeds(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<ApiResponse<Vec<ProfileView>>>> {
    let candidates = state.feeds.next_candidates(user.profile_id, query.profile_id).await?;
    Ok(Json(ApiResponse::ok(candidates.iter().map(ProfileView::from).collect())))
}

pub async fn swipe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SwipeRequest>,
) -> AppResult<Json<ApiResponse<Swipe>>> {
    let swipe = state.swipes.swipe(&user, req).await?;
    Ok(Json(ApiResponse::ok(swipe)))
}
