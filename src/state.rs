use std::sync::Arc;

use crate::{
    config::ConsistencyMode, middleware::auth::Authorizer, notify::Notifier,
    payment::PaymentGateway, store::DocumentStore,
};

/// Settings the services read on every call.
#[derive(Debug, Clone)]
pub struct Settings {
    pub consistency: ConsistencyMode,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub notifier: Notifier,
    pub gateway: Arc<dyn PaymentGateway>,
    pub authorizer: Arc<dyn Authorizer>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn strict(&self) -> bool {
        self.settings.consistency == ConsistencyMode::Strict
    }
}
