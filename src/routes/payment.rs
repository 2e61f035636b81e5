use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;

use crate::{
    dto::payment::{
        CreatePaymentOrderRequest, PaymentOrderResponse, PaymentVerification, RefundRequest,
        ServicePaymentRequest, ServicePaymentResponse, VerifyPaymentRequest,
        VerifyServicePaymentRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(create_payment_order))
        .route("/verify", post(verify_payment))
        .route("/service/create", post(create_service_payment))
        .route("/service/verify", post(verify_service_payment))
        .route("/refund", post(refund))
        .route("/{payment_id}", get(payment_details))
}

/// A signature mismatch is reported in the body with a 400 status.
fn verification_status(resp: &ApiResponse<PaymentVerification>) -> StatusCode {
    match &resp.data {
        Some(v) if v.success => StatusCode::OK,
        _ => StatusCode::BAD_REQUEST,
    }
}

#[utoipa::path(
    post,
    path = "/api/payment/create-order",
    request_body = CreatePaymentOrderRequest,
    responses(
        (status = 200, description = "Gateway order created", body = ApiResponse<PaymentOrderResponse>),
        (status = 400, description = "Invalid amount"),
        (status = 502, description = "Payment gateway error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payment"
)]
pub async fn create_payment_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePaymentOrderRequest>,
) -> AppResult<Json<ApiResponse<PaymentOrderResponse>>> {
    let resp = payment_service::create_payment_order(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payment/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Signature valid, order confirmed", body = ApiResponse<PaymentVerification>),
        (status = 400, description = "Signature mismatch or missing fields", body = ApiResponse<PaymentVerification>),
    ),
    security(("bearer_auth" = [])),
    tag = "Payment"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PaymentVerification>>)> {
    let resp = payment_service::verify_payment(&state, &user, payload).await?;
    Ok((verification_status(&resp), Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/payment/service/create",
    request_body = ServicePaymentRequest,
    responses(
        (status = 200, description = "Gateway order created for an appointment", body = ApiResponse<ServicePaymentResponse>),
        (status = 404, description = "Appointment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payment"
)]
pub async fn create_service_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ServicePaymentRequest>,
) -> AppResult<Json<ApiResponse<ServicePaymentResponse>>> {
    let resp = payment_service::create_service_payment(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payment/service/verify",
    request_body = VerifyServicePaymentRequest,
    responses(
        (status = 200, description = "Signature valid, appointment confirmed", body = ApiResponse<PaymentVerification>),
        (status = 400, description = "Signature mismatch", body = ApiResponse<PaymentVerification>),
    ),
    security(("bearer_auth" = [])),
    tag = "Payment"
)]
pub async fn verify_service_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VerifyServicePaymentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PaymentVerification>>)> {
    let resp = payment_service::verify_service_payment(&state, &user, payload).await?;
    Ok((verification_status(&resp), Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/payment/{payment_id}",
    params(("payment_id" = String, Path, description = "Gateway payment ID")),
    responses(
        (status = 200, description = "Payment as reported by the gateway"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payment"
)]
pub async fn payment_details(
    State(state): State<AppState>,
    user: AuthUser,
    Path(payment_id): Path<String>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = payment_service::payment_details(&state, &user, &payment_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payment/refund",
    request_body = RefundRequest,
    responses(
        (status = 200, description = "Refund initiated"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payment"
)]
pub async fn refund(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RefundRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = payment_service::refund(&state, &user, payload).await?;
    Ok(Json(resp))
}
