use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde_json::Value;

use crate::{
    dto::auth::{AddPetRequest, SessionResponse, UpdateProfileRequest, VerifyOtpRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Pet, User},
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify-otp", post(verify_otp))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/add-pet", post(add_pet))
        .route("/logout", post(logout))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Session issued", body = ApiResponse<SessionResponse>),
        (status = 400, description = "Missing token"),
        (status = 401, description = "Identity token rejected"),
    ),
    tag = "Auth"
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> AppResult<Json<ApiResponse<SessionResponse>>> {
    let resp = auth_service::verify_otp(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Caller's profile", body = ApiResponse<User>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::get_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<User>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/add-pet",
    request_body = AddPetRequest,
    responses(
        (status = 200, description = "Pet added", body = ApiResponse<Pet>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn add_pet(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddPetRequest>,
) -> AppResult<Json<ApiResponse<Pet>>> {
    let resp = auth_service::add_pet(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(user: AuthUser) -> Json<ApiResponse<Value>> {
    Json(auth_service::logout(&user).await)
}
