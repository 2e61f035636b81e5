//! Slot availability: a static catalog of labels per service domain minus the
//! labels already held on a date.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    lifecycle::ScheduleStatus,
    models::collections,
    store::{DocumentStore, Filter, Query, StoreResult},
};

/// Hourly labels 09:00-18:00.
pub const GENERAL_SLOTS: [&str; 10] = [
    "09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00", "17:00", "18:00",
];

/// Grooming and training sessions skip the 13:00 break.
pub const SESSION_SLOTS: [&str; 9] = [
    "09:00", "10:00", "11:00", "12:00", "14:00", "15:00", "16:00", "17:00", "18:00",
];

/// Daycare drop-off times.
pub const DAYCARE_SLOTS: [&str; 3] = ["08:00", "09:00", "10:00"];

/// The two scheduled entities. They share the lifecycle but not the catalog
/// or the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    Appointment,
    Booking,
}

impl ScheduleKind {
    pub fn collection(self) -> &'static str {
        match self {
            ScheduleKind::Appointment => collections::APPOINTMENTS,
            ScheduleKind::Booking => collections::BOOKINGS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScheduleKind::Appointment => "Appointment",
            ScheduleKind::Booking => "Booking",
        }
    }

    /// Field the admin's free-text note lands in.
    pub fn notes_field(self) -> &'static str {
        match self {
            ScheduleKind::Appointment => "adminNotes",
            ScheduleKind::Booking => "notes",
        }
    }

    pub fn catalog(self, service_type: Option<&str>) -> &'static [&'static str] {
        match self {
            ScheduleKind::Appointment => &GENERAL_SLOTS,
            ScheduleKind::Booking => booking_catalog(service_type),
        }
    }

    /// Bookings compete for a slot only within their service type;
    /// appointments share one calendar.
    pub fn slot_scope(self, service_type: Option<&str>) -> Option<&str> {
        match self {
            ScheduleKind::Appointment => None,
            ScheduleKind::Booking => service_type.filter(|s| !s.is_empty()),
        }
    }

    /// Store id of the claim document guarding one slot in strict mode.
    pub fn claim_id(self, service_type: &str, date: NaiveDate, time: &str) -> String {
        match self.slot_scope(Some(service_type)) {
            Some(scope) => format!("{}|{scope}|{date}|{time}", self.collection()),
            None => format!("{}|{date}|{time}", self.collection()),
        }
    }
}

/// Unknown or missing service types fall back to the general catalog.
pub fn booking_catalog(service_type: Option<&str>) -> &'static [&'static str] {
    match service_type {
        Some("grooming") | Some("training") => &SESSION_SLOTS,
        Some("daycare") => &DAYCARE_SLOTS,
        Some(other) if !other.is_empty() => {
            tracing::debug!(service_type = other, "unknown service type, using general slots");
            &GENERAL_SLOTS
        }
        _ => &GENERAL_SLOTS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub available_slots: Vec<String>,
    pub booked_slots: Vec<String>,
}

/// Split a catalog into free and held labels, both in catalog order. Held
/// labels outside the catalog are ignored.
pub fn carve<S: AsRef<str>>(catalog: &[&str], held: &[S]) -> SlotAvailability {
    let (booked, available): (Vec<&str>, Vec<&str>) = catalog
        .iter()
        .partition(|slot| held.iter().any(|h| h.as_ref() == **slot));
    SlotAvailability {
        available_slots: available.into_iter().map(str::to_string).collect(),
        booked_slots: booked.into_iter().map(str::to_string).collect(),
    }
}

/// Times held on `date` by pending or confirmed records of `kind`.
pub async fn held_slots(
    store: &dyn DocumentStore,
    kind: ScheduleKind,
    date: NaiveDate,
    service_type: Option<&str>,
) -> StoreResult<Vec<String>> {
    let query = Query::collection(kind.collection())
        .filter(Filter::eq("date", date.to_string()))
        .filter(Filter::any_of(
            "status",
            ScheduleStatus::HOLDING.map(|s| s.as_str()),
        ))
        .filter_opt(
            kind.slot_scope(service_type)
                .map(|scope| Filter::eq("serviceType", scope)),
        );

    Ok(store
        .query(&query)
        .await?
        .iter()
        .filter_map(|doc| doc.field("time").and_then(Value::as_str).map(str::to_string))
        .collect())
}

pub async fn availability(
    store: &dyn DocumentStore,
    kind: ScheduleKind,
    date: NaiveDate,
    service_type: Option<&str>,
) -> StoreResult<SlotAvailability> {
    let held = held_slots(store, kind, date, service_type).await?;
    Ok(carve(kind.catalog(service_type), &held))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carve_removes_held_labels_in_catalog_order() {
        let result = carve(&GENERAL_SLOTS, &["10:00", "09:00", "10:00"]);
        assert_eq!(result.booked_slots, ["09:00", "10:00"]);
        assert_eq!(result.available_slots.len(), 8);
        assert!(!result.available_slots.contains(&"10:00".to_string()));
    }

    #[test]
    fn available_and_booked_partition_the_catalog() {
        let held = ["08:00", "13:00", "15:00"];
        for catalog in [&GENERAL_SLOTS[..], &SESSION_SLOTS[..], &DAYCARE_SLOTS[..]] {
            let result = carve(catalog, &held);
            let mut union: Vec<String> = result
                .available_slots
                .iter()
                .chain(&result.booked_slots)
                .cloned()
                .collect();
            union.sort();
            let mut expected: Vec<String> = catalog.iter().map(|s| s.to_string()).collect();
            expected.sort();
            assert_eq!(union, expected);
            assert!(
                result
                    .available_slots
                    .iter()
                    .all(|slot| !held.contains(&slot.as_str()))
            );
        }
    }

    #[test]
    fn fully_booked_catalog_is_empty_not_an_error() {
        let result = carve(&DAYCARE_SLOTS, &DAYCARE_SLOTS);
        assert!(result.available_slots.is_empty());
        assert_eq!(result.booked_slots, DAYCARE_SLOTS);
    }

    #[test]
    fn booking_catalog_depends_on_service_type() {
        assert_eq!(booking_catalog(Some("grooming")), SESSION_SLOTS);
        assert_eq!(booking_catalog(Some("training")), SESSION_SLOTS);
        assert_eq!(booking_catalog(Some("daycare")), DAYCARE_SLOTS);
        assert_eq!(booking_catalog(Some("groming")), GENERAL_SLOTS);
        assert_eq!(booking_catalog(None), GENERAL_SLOTS);
    }

    #[test]
    fn claim_ids_scope_bookings_by_service() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(
            ScheduleKind::Appointment.claim_id("checkup", date, "10:00"),
            "appointments|2025-12-01|10:00"
        );
        assert_eq!(
            ScheduleKind::Booking.claim_id("daycare", date, "08:00"),
            "bookings|daycare|2025-12-01|08:00"
        );
    }
}
