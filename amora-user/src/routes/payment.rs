use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use amora_shared::errors::AppResult;
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::models::Payment;
use crate::services::payment_service::PaymentRequest;
use crate::AppState;

pub async fn create_payment(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PaymentRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let payment = state.payments.create_payment(&user, req).await?;
    Ok(Json(ApiResponse::ok_with_message(payment, "premium membership activated")))
}
