use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use crate::{
    response::{ApiResponse, Meta},
    routes::doc::scalar_docs,
    state::AppState,
};

pub mod appointments;
pub mod auth;
pub mod bookings;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod payment;
pub mod products;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/appointments", appointments::router())
        .nest("/booking", bookings::router())
        .nest("/orders", orders::router())
        .nest("/payment", payment::router())
        .nest("/products", products::router())
        .nest("/auth", auth::router())
}

/// Health, `/api`, docs and the JSON 404 fallback bound to `state`. Transport
/// layers are added by the binary.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
