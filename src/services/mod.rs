use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    audit::log_audit,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    state::AppState,
};

pub mod appointment_service;
pub mod auth_service;
pub mod booking_service;
pub mod order_service;
pub mod payment_service;
pub mod product_service;
pub mod schedule;

/// Fetch and decode one record, mapping absence to `NotFound(label)`.
pub(crate) async fn load<T: DeserializeOwned>(
    state: &AppState,
    collection: &str,
    id: &str,
    label: &str,
) -> AppResult<T> {
    let doc = state
        .store
        .get(collection, id)
        .await?
        .ok_or_else(|| AppError::not_found(label))?;
    Ok(doc.decode()?)
}

/// Audit writes never fail the request that triggered them.
pub(crate) async fn audit(
    state: &AppState,
    user: &AuthUser,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(&user.uid),
        action,
        Some(resource),
        Some(metadata),
    )
    .await
    {
        tracing::warn!(error = %err, action, resource, "failed to write audit log");
    }
}

/// Reject blank required strings with a single message naming all of them.
pub(crate) fn require(fields: &[(&str, &str)]) -> AppResult<()> {
    if fields.iter().any(|(_, value)| value.trim().is_empty()) {
        let names: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            names.join(", ")
        )));
    }
    Ok(())
}
