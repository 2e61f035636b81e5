use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::ShippingAddress;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// Prices and names come from the product catalog, so any client-side
/// `price`, `name` or `totalAmount` is ignored.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub payment_method: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    #[serde(alias = "status")]
    pub order_status: String,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: String,
    pub payment_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub payment_details: Option<Value>,
}
