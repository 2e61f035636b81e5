//! Status vocabularies and the transition guards that depend on them.
//!
//! Appointments and bookings share [`ScheduleStatus`]: `pending` and
//! `confirmed` hold a slot, `completed` and `cancelled` are terminal. Admin
//! status updates on them are unguarded. Orders track [`OrderStatus`] and
//! [`PaymentStatus`] independently; the only order guard is on cancellation.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ScheduleStatus {
    pub const HOLDING: [ScheduleStatus; 2] = [ScheduleStatus::Pending, ScheduleStatus::Confirmed];

    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "pending",
            ScheduleStatus::Confirmed => "confirmed",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }

    pub fn holds_slot(self) -> bool {
        Self::HOLDING.contains(&self)
    }
}

impl FromStr for ScheduleStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScheduleStatus::Pending),
            "confirmed" => Ok(ScheduleStatus::Confirmed),
            "completed" => Ok(ScheduleStatus::Completed),
            "cancelled" => Ok(ScheduleStatus::Cancelled),
            other => Err(AppError::BadRequest(format!("Invalid status: {other}"))),
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// States from which a cancel may proceed.
    pub const CANCELLABLE: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Confirmed];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether an order in this state keeps its items deducted from stock.
    pub fn reserves_stock(self) -> bool {
        self != OrderStatus::Cancelled
    }

    pub fn ensure_cancellable(self) -> AppResult<()> {
        match self {
            OrderStatus::Shipped | OrderStatus::Delivered => Err(AppError::Conflict(
                "Cannot cancel shipped or delivered orders".into(),
            )),
            OrderStatus::Cancelled => Err(AppError::Conflict("Order is already cancelled".into())),
            OrderStatus::Pending | OrderStatus::Confirmed => Ok(()),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::BadRequest(format!("Invalid order status: {other}"))),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(AppError::BadRequest(format!("Invalid payment status: {other}"))),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_and_confirmed_hold_slots() {
        assert!(ScheduleStatus::Pending.holds_slot());
        assert!(ScheduleStatus::Confirmed.holds_slot());
        assert!(!ScheduleStatus::Completed.holds_slot());
        assert!(!ScheduleStatus::Cancelled.holds_slot());
    }

    #[test]
    fn shipped_and_delivered_orders_cannot_be_cancelled() {
        assert!(OrderStatus::Pending.ensure_cancellable().is_ok());
        assert!(OrderStatus::Confirmed.ensure_cancellable().is_ok());
        for status in [OrderStatus::Shipped, OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(matches!(
                status.ensure_cancellable(),
                Err(AppError::Conflict(_))
            ));
        }
    }

    #[test]
    fn parsing_rejects_unknown_values() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!(matches!(
            "lost".parse::<OrderStatus>(),
            Err(AppError::BadRequest(_))
        ));
        assert!("done".parse::<ScheduleStatus>().is_err());
        assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
    }
}
