use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};

use crate::{
    dto::schedule::{CreateScheduleRequest, UpdateScheduleStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Booking,
    response::ApiResponse,
    routes::params::{ScheduleListQuery, SlotQuery},
    services::booking_service,
    slots::SlotAvailability,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/slots", get(booking_slots))
        .route("/my-bookings", get(my_bookings))
        .route("/", get(all_bookings).post(create_booking))
        .route("/{id}", get(get_booking))
        .route("/{id}/cancel", put(cancel_booking))
        .route("/{id}/status", put(update_booking_status))
}

#[utoipa::path(
    get,
    path = "/api/booking/slots",
    params(SlotQuery),
    responses(
        (status = 200, description = "Free and held slots for a service on a date", body = ApiResponse<SlotAvailability>),
        (status = 400, description = "Missing or malformed date"),
    ),
    tag = "Bookings"
)]
pub async fn booking_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<ApiResponse<SlotAvailability>>> {
    let resp = booking_service::available_slots(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/booking",
    request_body = CreateScheduleRequest,
    responses(
        (status = 201, description = "Booking created", body = ApiResponse<Booking>),
        (status = 400, description = "Missing fields, unknown slot or slot already booked"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateScheduleRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Booking>>)> {
    let resp = booking_service::create_booking(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/booking/my-bookings",
    params(ScheduleListQuery),
    responses(
        (status = 200, description = "Caller's bookings", body = ApiResponse<Vec<Booking>>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn my_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ScheduleListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Booking>>>> {
    let resp = booking_service::my_bookings(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/booking",
    params(ScheduleListQuery),
    responses(
        (status = 200, description = "All bookings (admin only)", body = ApiResponse<Vec<Booking>>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn all_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ScheduleListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Booking>>>> {
    let resp = booking_service::all_bookings(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/booking/{id}",
    params(("id" = String, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = ApiResponse<Booking>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let resp = booking_service::get_booking(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/booking/{id}/cancel",
    params(("id" = String, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking cancelled", body = ApiResponse<Booking>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let resp = booking_service::cancel_booking(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/booking/{id}/status",
    params(("id" = String, Path, description = "Booking ID")),
    request_body = UpdateScheduleStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Booking>),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn update_booking_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateScheduleStatusRequest>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let resp = booking_service::update_booking_status(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}
