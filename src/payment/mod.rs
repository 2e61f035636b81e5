//! Payment gateway port plus checkout signature verification.

pub mod gateway;
pub mod signature;

pub use gateway::{GatewayError, GatewayOrder, PaymentGateway, RazorpayClient};

/// Convert a rupee amount to paise, rounding to the nearest unit.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_round_float_noise() {
        assert_eq!(to_minor_units(499.0), 49900);
        assert_eq!(to_minor_units(19.99), 1999);
    }
}
