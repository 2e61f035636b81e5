pub mod auth;
pub mod orders;
pub mod payment;
pub mod products;
pub mod schedule;

use crate::models::Extra;

/// Drop keys a client may not set directly on a stored record.
pub fn strip_reserved(details: &mut Extra, reserved: &[&str]) {
    details.retain(|key, _| !reserved.contains(&key.as_str()));
}
