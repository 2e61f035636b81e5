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
    models::Appointment,
    response::ApiResponse,
    routes::params::{ScheduleListQuery, SlotQuery},
    services::appointment_service,
    slots::SlotAvailability,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/available-slots", get(available_slots))
        .route("/my-appointments", get(my_appointments))
        .route("/", get(all_appointments).post(create_appointment))
        .route("/{id}", get(get_appointment))
        .route("/{id}/cancel", put(cancel_appointment))
        .route("/{id}/status", put(update_appointment_status))
}

#[utoipa::path(
    get,
    path = "/api/appointments/available-slots",
    params(SlotQuery),
    responses(
        (status = 200, description = "Free and held slots for a date", body = ApiResponse<SlotAvailability>),
        (status = 400, description = "Missing or malformed date"),
    ),
    tag = "Appointments"
)]
pub async fn available_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<ApiResponse<SlotAvailability>>> {
    let resp = appointment_service::available_slots(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = CreateScheduleRequest,
    responses(
        (status = 201, description = "Appointment created", body = ApiResponse<Appointment>),
        (status = 400, description = "Missing fields, unknown slot or slot already booked"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Appointments"
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateScheduleRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Appointment>>)> {
    let resp = appointment_service::create_appointment(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/appointments/my-appointments",
    params(ScheduleListQuery),
    responses(
        (status = 200, description = "Caller's appointments, newest first", body = ApiResponse<Vec<Appointment>>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Appointments"
)]
pub async fn my_appointments(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ScheduleListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Appointment>>>> {
    let resp = appointment_service::my_appointments(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    params(ScheduleListQuery),
    responses(
        (status = 200, description = "All appointments (admin only)", body = ApiResponse<Vec<Appointment>>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Appointments"
)]
pub async fn all_appointments(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ScheduleListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Appointment>>>> {
    let resp = appointment_service::all_appointments(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment", body = ApiResponse<Appointment>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Appointments"
)]
pub async fn get_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Appointment>>> {
    let resp = appointment_service::get_appointment(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/cancel",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment cancelled", body = ApiResponse<Appointment>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Appointments"
)]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Appointment>>> {
    let resp = appointment_service::cancel_appointment(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/status",
    params(("id" = String, Path, description = "Appointment ID")),
    request_body = UpdateScheduleStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Appointment>),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Appointments"
)]
pub async fn update_appointment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateScheduleStatusRequest>,
) -> AppResult<Json<ApiResponse<Appointment>>> {
    let resp = appointment_service::update_appointment_status(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}
