use crate::{
    dto::schedule::{CreateScheduleRequest, UpdateScheduleStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Booking,
    response::ApiResponse,
    routes::params::{ScheduleListQuery, SlotQuery},
    services::schedule,
    slots::SlotAvailability,
    state::AppState,
};

/// Slots come from the catalog of `serviceType`; unknown types use the general one.
pub async fn available_slots(
    state: &AppState,
    query: SlotQuery,
) -> AppResult<ApiResponse<SlotAvailability>> {
    schedule::availability::<Booking>(state, query).await
}

pub async fn create_booking(
    state: &AppState,
    user: &AuthUser,
    payload: CreateScheduleRequest,
) -> AppResult<ApiResponse<Booking>> {
    schedule::create(state, user, payload).await
}

pub async fn my_bookings(
    state: &AppState,
    user: &AuthUser,
    query: ScheduleListQuery,
) -> AppResult<ApiResponse<Vec<Booking>>> {
    schedule::list_mine(state, user, query).await
}

pub async fn all_bookings(
    state: &AppState,
    user: &AuthUser,
    query: ScheduleListQuery,
) -> AppResult<ApiResponse<Vec<Booking>>> {
    schedule::list_all(state, user, query).await
}

pub async fn get_booking(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<Booking>> {
    schedule::get(state, user, id).await
}

pub async fn update_booking_status(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdateScheduleStatusRequest,
) -> AppResult<ApiResponse<Booking>> {
    schedule::update_status(state, user, id, payload).await
}

pub async fn cancel_booking(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<Booking>> {
    schedule::cancel(state, user, id).await
}
