use chrono::Utc;
use serde_json::{Value, json};

use crate::{
    dto::payment::{
        CreatePaymentOrderRequest, PaymentOrderResponse, PaymentVerification, RefundRequest,
        ServicePaymentRequest, ServicePaymentResponse, VerifyPaymentRequest,
        VerifyServicePaymentRequest,
    },
    error::{AppError, AppResult},
    lifecycle::{OrderStatus, PaymentStatus, ScheduleStatus},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin},
    models::{
        Appointment, Order,
        collections::{APPOINTMENTS, ORDERS},
    },
    payment::{signature, to_minor_units},
    response::ApiResponse,
    services::{audit, load},
    state::AppState,
    store::fields,
};

fn positive(amount: f64) -> AppResult<f64> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(AppError::BadRequest("Amount must be greater than zero".into()))
    }
}

fn require_callback(order_id: &str, payment_id: &str, signature: &str) -> AppResult<()> {
    if [order_id, payment_id, signature]
        .iter()
        .any(|v| v.trim().is_empty())
    {
        return Err(AppError::BadRequest(
            "Missing payment verification fields".into(),
        ));
    }
    Ok(())
}

fn failed() -> PaymentVerification {
    PaymentVerification {
        success: false,
        message: "Invalid payment signature".into(),
        payment_id: None,
    }
}

fn verified(payment_id: &str) -> PaymentVerification {
    PaymentVerification {
        success: true,
        message: "Payment verified successfully".into(),
        payment_id: Some(payment_id.to_string()),
    }
}

pub async fn create_payment_order(
    state: &AppState,
    _user: &AuthUser,
    payload: CreatePaymentOrderRequest,
) -> AppResult<ApiResponse<PaymentOrderResponse>> {
    let amount = positive(payload.amount)?;
    let receipt = payload
        .receipt
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| format!("receipt_{}", Utc::now().timestamp_millis()));
    let order = state
        .gateway
        .create_order(to_minor_units(amount), &payload.currency, &receipt)
        .await?;
    Ok(ApiResponse::success(
        "Payment order created",
        PaymentOrderResponse {
            order,
            key_id: state.settings.razorpay_key_id.clone(),
        },
        None,
    ))
}

/// Check a checkout callback for a shop order. A match confirms the order;
/// a mismatch marks its payment failed and reports `success: false`.
pub async fn verify_payment(
    state: &AppState,
    user: &AuthUser,
    payload: VerifyPaymentRequest,
) -> AppResult<ApiResponse<PaymentVerification>> {
    require_callback(
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    )?;
    let order_id = payload.order_id.as_deref().filter(|id| !id.is_empty());
    if let Some(order_id) = order_id {
        let order: Order = load(state, ORDERS, order_id, "Order").await?;
        ensure_owner_or_admin(user, &order.user_id)?;
    }

    let valid = signature::verify(
        &state.settings.razorpay_key_secret,
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    );

    if !valid {
        tracing::warn!(gateway_order = %payload.razorpay_order_id, order_id = ?order_id, "payment signature mismatch");
        if let Some(order_id) = order_id {
            let patch = fields(json!({
                "paymentStatus": PaymentStatus::Failed,
                "updatedAt": Utc::now(),
            }));
            state.store.update(ORDERS, order_id, patch).await?;
            audit(state, user, "payment.failed", order_id, json!({})).await;
        }
        return Ok(ApiResponse::success("Invalid payment signature", failed(), None));
    }

    if let Some(order_id) = order_id {
        let patch = fields(json!({
            "paymentStatus": PaymentStatus::Completed,
            "paymentId": payload.razorpay_payment_id,
            "paymentDetails": {
                "razorpay_order_id": payload.razorpay_order_id,
                "razorpay_payment_id": payload.razorpay_payment_id,
                "razorpay_signature": payload.razorpay_signature,
            },
            "orderStatus": OrderStatus::Confirmed,
            "updatedAt": Utc::now(),
        }));
        state.store.update(ORDERS, order_id, patch).await?;
        audit(
            state,
            user,
            "payment.verified",
            order_id,
            json!({ "paymentId": payload.razorpay_payment_id }),
        )
        .await;
    }

    tracing::info!(payment_id = %payload.razorpay_payment_id, "payment verified");
    Ok(ApiResponse::success(
        "Payment verified successfully",
        verified(&payload.razorpay_payment_id),
        None,
    ))
}

/// Open a gateway order for an appointment fee and remember it on the appointment.
pub async fn create_service_payment(
    state: &AppState,
    user: &AuthUser,
    payload: ServicePaymentRequest,
) -> AppResult<ApiResponse<ServicePaymentResponse>> {
    let amount = positive(payload.amount)?;
    let appointment: Appointment =
        load(state, APPOINTMENTS, &payload.appointment_id, "Appointment").await?;
    ensure_owner_or_admin(user, &appointment.user_id)?;

    let receipt = format!("appointment_{}", appointment.id);
    let order = state
        .gateway
        .create_order(to_minor_units(amount), "INR", &receipt)
        .await?;

    let patch = fields(json!({
        "paymentOrderId": order.id,
        "paymentStatus": PaymentStatus::Pending,
        "updatedAt": Utc::now(),
    }));
    state
        .store
        .update(APPOINTMENTS, &appointment.id, patch)
        .await?;

    if let Some(description) = payload.description.as_deref() {
        tracing::debug!(appointment_id = %appointment.id, description, "service payment opened");
    }

    Ok(ApiResponse::success(
        "Payment order created",
        ServicePaymentResponse {
            order,
            key_id: state.settings.razorpay_key_id.clone(),
            appointment_id: appointment.id,
        },
        None,
    ))
}

/// Same check as [`verify_payment`] for an appointment fee. A mismatch marks
/// the payment failed but leaves the appointment status alone.
pub async fn verify_service_payment(
    state: &AppState,
    user: &AuthUser,
    payload: VerifyServicePaymentRequest,
) -> AppResult<ApiResponse<PaymentVerification>> {
    require_callback(
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    )?;
    let appointment: Appointment =
        load(state, APPOINTMENTS, &payload.appointment_id, "Appointment").await?;
    ensure_owner_or_admin(user, &appointment.user_id)?;

    let valid = signature::verify(
        &state.settings.razorpay_key_secret,
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    );

    if !valid {
        tracing::warn!(appointment_id = %appointment.id, "service payment signature mismatch");
        let patch = fields(json!({
            "paymentStatus": PaymentStatus::Failed,
            "updatedAt": Utc::now(),
        }));
        state
            .store
            .update(APPOINTMENTS, &appointment.id, patch)
            .await?;
        return Ok(ApiResponse::success("Invalid payment signature", failed(), None));
    }

    let patch = fields(json!({
        "paymentStatus": PaymentStatus::Completed,
        "paymentId": payload.razorpay_payment_id,
        "paymentDetails": {
            "razorpay_order_id": payload.razorpay_order_id,
            "razorpay_payment_id": payload.razorpay_payment_id,
            "razorpay_signature": payload.razorpay_signature,
        },
        "status": ScheduleStatus::Confirmed,
        "updatedAt": Utc::now(),
    }));
    state
        .store
        .update(APPOINTMENTS, &appointment.id, patch)
        .await?;
    audit(
        state,
        user,
        "payment.service_verified",
        &appointment.id,
        json!({ "paymentId": payload.razorpay_payment_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment verified successfully",
        verified(&payload.razorpay_payment_id),
        None,
    ))
}

pub async fn payment_details(
    state: &AppState,
    user: &AuthUser,
    payment_id: &str,
) -> AppResult<ApiResponse<Value>> {
    ensure_admin(user)?;
    let payment = state.gateway.fetch_payment(payment_id).await?;
    Ok(ApiResponse::success("Ok", payment, None))
}

pub async fn refund(
    state: &AppState,
    user: &AuthUser,
    payload: RefundRequest,
) -> AppResult<ApiResponse<Value>> {
    ensure_admin(user)?;
    if payload.payment_id.trim().is_empty() {
        return Err(AppError::BadRequest("paymentId is required".into()));
    }
    let amount = payload.amount.map(positive).transpose()?.map(to_minor_units);
    let refund = state
        .gateway
        .refund(&payload.payment_id, amount, payload.notes.as_ref())
        .await?;
    audit(
        state,
        user,
        "payment.refund",
        &payload.payment_id,
        json!({ "amount": amount }),
    )
    .await;
    Ok(ApiResponse::success(
        "Refund initiated successfully",
        refund,
        None,
    ))
}
