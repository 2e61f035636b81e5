use crate::{
    dto::schedule::{CreateScheduleRequest, UpdateScheduleStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Appointment,
    response::ApiResponse,
    routes::params::{ScheduleListQuery, SlotQuery},
    services::schedule,
    slots::SlotAvailability,
    state::AppState,
};

/// General appointments share one ten-slot calendar regardless of service.
pub async fn available_slots(
    state: &AppState,
    query: SlotQuery,
) -> AppResult<ApiResponse<SlotAvailability>> {
    schedule::availability::<Appointment>(state, query).await
}

pub async fn create_appointment(
    state: &AppState,
    user: &AuthUser,
    payload: CreateScheduleRequest,
) -> AppResult<ApiResponse<Appointment>> {
    schedule::create(state, user, payload).await
}

pub async fn my_appointments(
    state: &AppState,
    user: &AuthUser,
    query: ScheduleListQuery,
) -> AppResult<ApiResponse<Vec<Appointment>>> {
    schedule::list_mine(state, user, query).await
}

pub async fn all_appointments(
    state: &AppState,
    user: &AuthUser,
    query: ScheduleListQuery,
) -> AppResult<ApiResponse<Vec<Appointment>>> {
    schedule::list_all(state, user, query).await
}

pub async fn get_appointment(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<Appointment>> {
    schedule::get(state, user, id).await
}

pub async fn update_appointment_status(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdateScheduleStatusRequest,
) -> AppResult<ApiResponse<Appointment>> {
    schedule::update_status(state, user, id, payload).await
}

pub async fn cancel_appointment(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<Appointment>> {
    schedule::cancel(state, user, id).await
}
