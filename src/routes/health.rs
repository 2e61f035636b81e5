use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::ConsistencyMode,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub store: String,
    pub consistency: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "OK", body = ApiResponse<HealthData>),
    ),
        tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    let store = match state.store.get("health", "probe").await {
        Ok(_) => "reachable",
        Err(err) => {
            tracing::warn!(error = %err, "store probe failed");
            "unreachable"
        }
    };
    let data = HealthData {
        status: if store == "reachable" { "ok" } else { "degraded" }.to_string(),
        store: store.to_string(),
        consistency: match state.settings.consistency {
            ConsistencyMode::BestEffort => "best_effort",
            ConsistencyMode::Strict => "strict",
        }
        .to_string(),
    };

    Json(ApiResponse::success(
        "Health check",
        data,
        Some(Meta::empty()),
    ))
}
