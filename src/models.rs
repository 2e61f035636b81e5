use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::lifecycle::{OrderStatus, PaymentStatus, ScheduleStatus};

/// Collection names shared across services.
pub mod collections {
    pub const USERS: &str = "users";
    pub const APPOINTMENTS: &str = "appointments";
    pub const BOOKINGS: &str = "bookings";
    pub const ORDERS: &str = "orders";
    pub const PRODUCTS: &str = "products";
    pub const SLOT_CLAIMS: &str = "slot_claims";
}

/// Client-supplied fields kept alongside the typed ones (pet name, notes, images...).
pub type Extra = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub details: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub address: String,
    pub pets: Vec<Pet>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn email(&self) -> Option<&str> {
        Some(self.profile.email.trim()).filter(|email| !email.is_empty())
    }

    pub fn display_name(&self) -> Option<&str> {
        Some(self.profile.name.trim()).filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub user_id: String,
    pub service_type: String,
    pub date: NaiveDate,
    pub time: String,
    pub status: ScheduleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub payment_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub details: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub service_type: String,
    pub date: NaiveDate,
    pub time: String,
    pub status: ScheduleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub details: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub price: f64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Extra,
}

impl ShippingAddress {
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {} - {}",
            self.street, self.city, self.state, self.pincode
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub total_amount: f64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub payment_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user_id: String,
    pub user_name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub stock: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub details: Extra,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
}
