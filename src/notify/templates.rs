use serde_json::Value;

/// Named HTML email bodies. Missing keys render as `N/A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    AppointmentConfirmation,
    BookingConfirmation,
    OrderConfirmation,
}

impl Template {
    pub fn name(self) -> &'static str {
        match self {
            Template::AppointmentConfirmation => "appointmentConfirmation",
            Template::BookingConfirmation => "bookingConfirmation",
            Template::OrderConfirmation => "orderConfirmation",
        }
    }

    pub fn render(self, data: &Value) -> String {
        match self {
            Template::AppointmentConfirmation => format!(
                "<h2>Appointment Confirmation</h2>\
                 <p>Dear Customer,</p>\
                 <p>Your appointment has been confirmed!</p>\
                 <ul>\
                 <li><strong>Service:</strong> {}</li>\
                 <li><strong>Date:</strong> {}</li>\
                 <li><strong>Time:</strong> {}</li>\
                 <li><strong>Pet:</strong> {}</li>\
                 </ul>\
                 <p>Please arrive 10 minutes before your scheduled time.</p>\
                 <p>Best regards,<br>Pet Services Team</p>",
                text(data, "serviceType"),
                text(data, "date"),
                text(data, "time"),
                text(data, "petName"),
            ),
            Template::BookingConfirmation => format!(
                "<h2>Booking Confirmation</h2>\
                 <p>Dear Customer,</p>\
                 <p>Your booking has been confirmed!</p>\
                 <ul>\
                 <li><strong>Booking ID:</strong> {}</li>\
                 <li><strong>Service:</strong> {}</li>\
                 <li><strong>Date:</strong> {}</li>\
                 <li><strong>Time:</strong> {}</li>\
                 <li><strong>Duration:</strong> {}</li>\
                 </ul>\
                 <p>We look forward to serving you and your pet!</p>\
                 <p>Best regards,<br>Pet Services Team</p>",
                text(data, "bookingId"),
                text(data, "serviceType"),
                text(data, "date"),
                text(data, "time"),
                text(data, "duration"),
            ),
            Template::OrderConfirmation => {
                let items: String = data
                    .get("items")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .map(|item| {
                                format!(
                                    "<li>{} - Quantity: {} - ₹{}</li>",
                                    text(item, "name"),
                                    text(item, "quantity"),
                                    text(item, "price"),
                                )
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                format!(
                    "<h2>Order Confirmation</h2>\
                     <p>Dear Customer,</p>\
                     <p>Thank you for your order!</p>\
                     <ul>\
                     <li><strong>Order ID:</strong> {}</li>\
                     <li><strong>Total Amount:</strong> ₹{}</li>\
                     <li><strong>Payment Status:</strong> {}</li>\
                     </ul>\
                     <h4>Items:</h4><ul>{items}</ul>\
                     <h4>Shipping Address:</h4><p>{}</p>\
                     <p>Best regards,<br>Pet Services Team</p>",
                    text(data, "orderId"),
                    text(data, "totalAmount"),
                    text(data, "paymentStatus"),
                    text(data, "shippingAddress"),
                )
            }
        }
    }
}

fn text(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn appointment_template_fills_placeholders() {
        let html = Template::AppointmentConfirmation.render(&json!({
            "serviceType": "grooming",
            "date": "2025-12-01",
            "time": "10:00",
        }));
        assert!(html.contains("grooming"));
        assert!(html.contains("10:00"));
        assert!(html.contains("<strong>Pet:</strong> N/A"));
    }

    #[test]
    fn order_template_lists_items() {
        let html = Template::OrderConfirmation.render(&json!({
            "orderId": "o1",
            "totalAmount": 1000.0,
            "paymentStatus": "pending",
            "items": [{ "name": "Kibble", "quantity": 2, "price": 500.0 }],
            "shippingAddress": "1 Main St, Pune, MH - 411001",
        }));
        assert!(html.contains("Kibble - Quantity: 2"));
        assert!(html.contains("Pune"));
    }
}
