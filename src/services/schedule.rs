//! Lifecycle shared by appointments and bookings.
//!
//! Both are slot-holding records: `pending` and `confirmed` occupy a
//! date/time label, `completed` and `cancelled` free it. Admin status changes
//! are unguarded and a cancel is accepted from any state. In strict mode each
//! held slot is backed by a claim document so concurrent creates cannot both
//! win the same label.

use chrono::{NaiveDate, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    dto::{
        schedule::{CreateScheduleRequest, RESERVED, UpdateScheduleStatusRequest},
        strip_reserved,
    },
    error::{AppError, AppResult},
    lifecycle::ScheduleStatus,
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin},
    models::{Appointment, Booking, Extra, collections::SLOT_CLAIMS},
    notify::{EmailDraft, Template, notify_owner},
    response::ApiResponse,
    routes::params::{ScheduleListQuery, SlotQuery},
    services::{audit, load, require},
    slots::{self, ScheduleKind, SlotAvailability},
    state::AppState,
    store::{Direction, Filter, Query, encode, fields, new_id},
};

/// A record that occupies a slot.
pub trait Scheduled: Serialize + DeserializeOwned + Send + Sync {
    const KIND: ScheduleKind;

    fn build(
        id: String,
        user_id: String,
        request: CreateScheduleRequest,
        date: NaiveDate,
        details: Extra,
    ) -> Self;

    fn id(&self) -> &str;
    fn user_id(&self) -> &str;
    fn status(&self) -> ScheduleStatus;
    fn service_type(&self) -> &str;
    fn date(&self) -> NaiveDate;
    fn time(&self) -> &str;

    fn confirmation(&self) -> EmailDraft;

    fn claim_id(&self) -> String {
        Self::KIND.claim_id(self.service_type(), self.date(), self.time())
    }
}

impl Scheduled for Appointment {
    const KIND: ScheduleKind = ScheduleKind::Appointment;

    fn build(
        id: String,
        user_id: String,
        request: CreateScheduleRequest,
        date: NaiveDate,
        details: Extra,
    ) -> Self {
        let now = Utc::now();
        Appointment {
            id,
            user_id,
            service_type: request.service_type,
            date,
            time: request.time,
            status: ScheduleStatus::Pending,
            payment_status: None,
            payment_order_id: None,
            payment_id: None,
            payment_details: None,
            admin_notes: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            details,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
    fn user_id(&self) -> &str {
        &self.user_id
    }
    fn status(&self) -> ScheduleStatus {
        self.status
    }
    fn service_type(&self) -> &str {
        &self.service_type
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn time(&self) -> &str {
        &self.time
    }

    fn confirmation(&self) -> EmailDraft {
        EmailDraft {
            subject: "Appointment Confirmation".into(),
            template: Template::AppointmentConfirmation,
            data: serde_json::to_value(self).unwrap_or(Value::Null),
        }
    }
}

impl Scheduled for Booking {
    const KIND: ScheduleKind = ScheduleKind::Booking;

    fn build(
        id: String,
        user_id: String,
        request: CreateScheduleRequest,
        date: NaiveDate,
        details: Extra,
    ) -> Self {
        let now = Utc::now();
        Booking {
            id,
            user_id,
            service_type: request.service_type,
            date,
            time: request.time,
            status: ScheduleStatus::Pending,
            notes: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            details,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
    fn user_id(&self) -> &str {
        &self.user_id
    }
    fn status(&self) -> ScheduleStatus {
        self.status
    }
    fn service_type(&self) -> &str {
        &self.service_type
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn time(&self) -> &str {
        &self.time
    }

    fn confirmation(&self) -> EmailDraft {
        let mut data = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut data {
            map.insert("bookingId".into(), Value::String(self.id.clone()));
        }
        EmailDraft {
            subject: format!("Booking Confirmation - {}", self.service_type),
            template: Template::BookingConfirmation,
            data,
        }
    }
}

pub fn parse_date(raw: Option<&str>) -> AppResult<NaiveDate> {
    let raw = raw
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::BadRequest("Date is required".into()))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date {raw}, expected YYYY-MM-DD")))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn slot_taken(date: NaiveDate, time: &str) -> AppError {
    AppError::Conflict(format!("Time slot {time} on {date} is already booked"))
}

pub async fn availability<T: Scheduled>(
    state: &AppState,
    query: SlotQuery,
) -> AppResult<ApiResponse<SlotAvailability>> {
    let date = parse_date(query.date.as_deref())?;
    let result = slots::availability(
        state.store.as_ref(),
        T::KIND,
        date,
        non_empty(&query.service_type),
    )
    .await?;
    Ok(ApiResponse::success("Ok", result, None))
}

pub async fn create<T: Scheduled>(
    state: &AppState,
    user: &AuthUser,
    mut payload: CreateScheduleRequest,
) -> AppResult<ApiResponse<T>> {
    let kind = T::KIND;
    require(&[
        ("serviceType", payload.service_type.as_str()),
        ("date", payload.date.as_str()),
        ("time", payload.time.as_str()),
    ])?;
    let date = parse_date(Some(payload.date.as_str()))?;
    payload.service_type = payload.service_type.trim().to_string();
    payload.time = payload.time.trim().to_string();

    if !kind
        .catalog(Some(payload.service_type.as_str()))
        .contains(&payload.time.as_str())
    {
        return Err(AppError::BadRequest(format!(
            "Invalid time slot {}",
            payload.time
        )));
    }

    let held = slots::held_slots(
        state.store.as_ref(),
        kind,
        date,
        Some(payload.service_type.as_str()),
    )
    .await?;
    if held.iter().any(|t| *t == payload.time) {
        return Err(slot_taken(date, &payload.time));
    }

    let mut details = std::mem::take(&mut payload.details);
    strip_reserved(&mut details, RESERVED);

    let record = T::build(new_id(), user.uid.clone(), payload, date, details);

    if state.strict() {
        claim(state, &record).await?;
    }
    if let Err(err) = state
        .store
        .set(kind.collection(), record.id(), encode(&record)?)
        .await
    {
        if state.strict() {
            release(state, &record).await;
        }
        return Err(err.into());
    }

    tracing::info!(
        kind = kind.label(),
        id = record.id(),
        date = %date,
        time = record.time(),
        "slot booked"
    );

    let text = format!(
        "Your {} for {} on {} at {} has been received. {} ID: {}",
        kind.label().to_lowercase(),
        record.service_type(),
        date,
        record.time(),
        kind.label(),
        record.id()
    );
    notify_owner(
        state.store.as_ref(),
        &state.notifier,
        &user.uid,
        Some(record.confirmation()),
        Some(text),
    )
    .await;

    audit(
        state,
        user,
        &format!("{}.create", kind.collection()),
        record.id(),
        json!({ "date": date, "time": record.time(), "serviceType": record.service_type() }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("{} created successfully", kind.label()),
        record,
        None,
    ))
}

fn list_query<T: Scheduled>(query: &ScheduleListQuery) -> AppResult<Query> {
    let status = match non_empty(&query.status) {
        Some(raw) => Some(raw.parse::<ScheduleStatus>()?),
        None => None,
    };
    let date = match non_empty(&query.date) {
        Some(raw) => Some(parse_date(Some(raw))?),
        None => None,
    };
    Ok(Query::collection(T::KIND.collection())
        .filter_opt(status.map(|s| Filter::eq("status", s.as_str())))
        .filter_opt(date.map(|d| Filter::eq("date", d.to_string())))
        .filter_opt(non_empty(&query.service_type).map(|s| Filter::eq("serviceType", s)))
        .order_by("createdAt", Direction::Desc))
}

async fn run_list<T: Scheduled>(
    state: &AppState,
    query: Query,
    pagination: crate::routes::params::Pagination,
) -> AppResult<ApiResponse<Vec<T>>> {
    let records = state
        .store
        .query(&query)
        .await?
        .iter()
        .map(|doc| doc.decode::<T>())
        .collect::<Result<Vec<_>, _>>()?;
    let (items, meta) = pagination.apply(records);
    Ok(ApiResponse::success("Ok", items, Some(meta)))
}

/// The caller's records. The `date` filter is ignored here.
pub async fn list_mine<T: Scheduled>(
    state: &AppState,
    user: &AuthUser,
    mut query: ScheduleListQuery,
) -> AppResult<ApiResponse<Vec<T>>> {
    query.date = None;
    let store_query = list_query::<T>(&query)?.filter(Filter::eq("userId", user.uid.as_str()));
    run_list(state, store_query, query.pagination()).await
}

pub async fn list_all<T: Scheduled>(
    state: &AppState,
    user: &AuthUser,
    query: ScheduleListQuery,
) -> AppResult<ApiResponse<Vec<T>>> {
    ensure_admin(user)?;
    let store_query = list_query::<T>(&query)?;
    run_list(state, store_query, query.pagination()).await
}

pub async fn get<T: Scheduled>(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<T>> {
    let record: T = load(state, T::KIND.collection(), id, T::KIND.label()).await?;
    ensure_owner_or_admin(user, record.user_id())?;
    Ok(ApiResponse::success("Ok", record, None))
}

pub async fn update_status<T: Scheduled>(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdateScheduleStatusRequest,
) -> AppResult<ApiResponse<T>> {
    ensure_admin(user)?;
    let kind = T::KIND;
    let next = payload.status.trim().parse::<ScheduleStatus>()?;
    let current: T = load(state, kind.collection(), id, kind.label()).await?;
    let previous = current.status();

    let reclaim = state.strict() && !previous.holds_slot() && next.holds_slot();
    if reclaim {
        claim(state, &current).await?;
    }

    let mut patch = fields(json!({
        "status": next,
        "updatedAt": Utc::now(),
    }));
    if let Some(notes) = non_empty(&payload.notes) {
        patch.insert(kind.notes_field().into(), Value::String(notes.to_string()));
    }

    let updated = match state.store.update(kind.collection(), id, patch).await {
        Ok(doc) => doc.decode::<T>()?,
        Err(err) => {
            if reclaim {
                release(state, &current).await;
            }
            return Err(err.into());
        }
    };

    if state.strict() && previous.holds_slot() && !next.holds_slot() {
        release(state, &current).await;
    }

    tracing::info!(kind = kind.label(), id, from = %previous, to = %next, "status updated");

    let text = format!(
        "Your {} (ID: {id}) status has been updated to: {next}",
        kind.label().to_lowercase()
    );
    notify_owner(
        state.store.as_ref(),
        &state.notifier,
        updated.user_id(),
        None,
        Some(text),
    )
    .await;

    audit(
        state,
        user,
        &format!("{}.status", kind.collection()),
        id,
        json!({ "from": previous, "to": next }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("{} updated successfully", kind.label()),
        updated,
        None,
    ))
}

/// Owner or admin cancel. Accepted from any state; an already cancelled
/// record is returned unchanged.
pub async fn cancel<T: Scheduled>(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<T>> {
    let kind = T::KIND;
    let current: T = load(state, kind.collection(), id, kind.label()).await?;
    ensure_owner_or_admin(user, current.user_id())?;

    if current.status() == ScheduleStatus::Cancelled {
        return Ok(ApiResponse::success(
            format!("{} already cancelled", kind.label()),
            current,
            None,
        ));
    }

    let now = Utc::now();
    let patch = fields(json!({
        "status": ScheduleStatus::Cancelled,
        "cancelledAt": now,
        "updatedAt": now,
    }));
    let updated = state
        .store
        .update(kind.collection(), id, patch)
        .await?
        .decode::<T>()?;

    if state.strict() && current.status().holds_slot() {
        release(state, &current).await;
    }

    audit(
        state,
        user,
        &format!("{}.cancel", kind.collection()),
        id,
        json!({ "from": current.status() }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("{} cancelled successfully", kind.label()),
        updated,
        None,
    ))
}

/// Take the slot claim for `record`, or fail if another record holds it.
async fn claim<T: Scheduled>(state: &AppState, record: &T) -> AppResult<()> {
    let claim_id = record.claim_id();
    let body = fields(json!({
        "holderId": record.id(),
        "collection": T::KIND.collection(),
        "createdAt": Utc::now(),
    }));
    if state
        .store
        .create_if_absent(SLOT_CLAIMS, &claim_id, body)
        .await?
    {
        return Ok(());
    }

    let holder = state
        .store
        .get(SLOT_CLAIMS, &claim_id)
        .await?
        .and_then(|doc| doc.field("holderId").and_then(Value::as_str).map(str::to_string));
    if holder.as_deref() == Some(record.id()) {
        return Ok(());
    }
    Err(slot_taken(record.date(), record.time()))
}

/// Drop the claim if `record` still owns it. Failures are logged only.
async fn release<T: Scheduled>(state: &AppState, record: &T) {
    let claim_id = record.claim_id();
    let result = async {
        let holder = state
            .store
            .get(SLOT_CLAIMS, &claim_id)
            .await?
            .and_then(|doc| doc.field("holderId").and_then(Value::as_str).map(str::to_string));
        if holder.as_deref() == Some(record.id()) {
            state.store.delete(SLOT_CLAIMS, &claim_id).await?;
        }
        Ok::<_, crate::store::StoreError>(())
    }
    .await;
    if let Err(err) = result {
        tracing::warn!(error = %err, claim_id = %claim_id, "failed to release slot claim");
    }
}
