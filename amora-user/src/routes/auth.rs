use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use amora_shared::errors::AppResult;
use amora_shared::types::auth::{AccessToken, AuthUser};
use amora_shared::types::ApiResponse;

use crate::models::ProfileView;
use crate::services::auth_service::{AuthRequest, ResendOtpRequest, ResendOtpResponse};
use crate::AppState;

pub async fn resend_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResendOtpRequest>,
) -> AppResult<Json<ApiResponse<ResendOtpResponse>>> {
    let res = state.auth.resend_otp(req).await?;
    Ok(Json(ApiResponse::ok(res)))
}

pub async fn login_or_register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthRequest>,
) -> AppResult<Json<ApiResponse<AccessToken>>> {
    let token = state.auth.login_or_register(req).await?;
    Ok(Json(ApiResponse::ok(token)))
}

pub async fn logout(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    state.auth.logout(user.id, user.token_id).await?;
    Ok(Json(ApiResponse::ok("logged out")))
}

pub async fn show_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = state.auth.show_profile(user.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}
