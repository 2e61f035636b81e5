//! Checkout signature check: HMAC-SHA256 over `order_id|payment_id`, hex encoded.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length.
        Err(_) => return String::new(),
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison against the expected digest. Case matters: the
/// gateway emits lowercase hex.
pub fn verify(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let expected = sign(secret, order_id, payment_id);
    !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
}
