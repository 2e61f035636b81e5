use chrono::Utc;
use serde_json::{Value, json};

use crate::store::{DocumentStore, StoreResult, fields, new_id};

pub const COLLECTION: &str = "audit_logs";

pub async fn log_audit(
    store: &dyn DocumentStore,
    user_id: Option<&str>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> StoreResult<()> {
    let entry = json!({
        "userId": user_id,
        "action": action,
        "resource": resource,
        "metadata": metadata,
        "createdAt": Utc::now(),
    });
    store.set(COLLECTION, &new_id(), fields(entry)).await
}
