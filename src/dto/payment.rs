use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::payment::GatewayOrder;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentOrderRequest {
    /// Major currency units.
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub receipt: Option<String>,
}

fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrderResponse {
    pub order: GatewayOrder,
    pub key_id: String,
}

/// Gateway callback fields, named the way the checkout widget posts them.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_payment_id: String,
    #[serde(default)]
    pub razorpay_signature: String,
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyServicePaymentRequest {
    #[serde(default)]
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_payment_id: String,
    #[serde(default)]
    pub razorpay_signature: String,
    #[serde(rename = "appointmentId")]
    pub appointment_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServicePaymentRequest {
    pub appointment_id: String,
    pub amount: f64,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServicePaymentResponse {
    pub order: GatewayOrder,
    pub key_id: String,
    pub appointment_id: String,
}

/// Outcome of a signature check. Mismatches are reported with this body and
/// a 400 status rather than as a generic error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub payment_id: String,
    /// Major currency units; omit for a full refund.
    pub amount: Option<f64>,
    #[schema(value_type = Option<Object>)]
    pub notes: Option<Value>,
}
