use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::Extra;

/// Body for creating an appointment or a booking. Unknown fields (pet name,
/// duration, notes...) are stored with the record.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub details: Extra,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateScheduleStatusRequest {
    pub status: String,
    #[serde(default, alias = "adminNotes")]
    pub notes: Option<String>,
}

/// Keys owned by the server on appointments and bookings.
pub const RESERVED: &[&str] = &[
    "id",
    "userId",
    "status",
    "paymentStatus",
    "paymentOrderId",
    "paymentId",
    "paymentDetails",
    "adminNotes",
    "cancelledAt",
    "createdAt",
    "updatedAt",
];
