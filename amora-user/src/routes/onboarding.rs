use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::services::onboarding_service::{HobbyAndInterestRequest, LocationRequest, PersonalInfoRequest};
use crate::storage::PhotoUpload;
use crate::AppState;

const PHOTOS_FIELD: &str = "photos";

pub async fn update_personal_info(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PersonalInfoRequest>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    state.onboarding.update_personal_info(user.id, req).await?;
    Ok(Json(ApiResponse::ok("personal info updated")))
}

pub async fn update_photos(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<Vec<String>>>> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(PHOTOS_FIELD) {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        uploads.push(PhotoUpload { content_type, bytes: bytes.to_vec() });
    }

    let urls = state.onboarding.update_photos(user.id, uploads).await?;
    Ok(Json(ApiResponse::ok(urls)))
}

pub async fn update_hobby_and_interest(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<HobbyAndInterestRequest>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    state.onboarding.update_hobby_and_interest(user.id, req).await?;
    Ok(Json(ApiResponse::ok("hobby and interest updated")))
}

pub async fn update_location(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LocationRequest>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    state.onboarding.update_location(user.id, req).await?;
    Ok(Json(ApiResponse::ok("location updated")))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(ErrorCode::PayloadTooLarge, "upload is too large")
    } else {
        AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read multipart: {e}"))
    }
}
