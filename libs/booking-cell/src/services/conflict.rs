// libs/booking-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::NaiveTime;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::postgrest::PostgrestClient;

use availability_cell::models::AvailabilitySlot;

use crate::models::{Booking, BookingError};
use crate::services::time::{add_minutes, intervals_overlap};

const BUFFER_MINUTES: i64 = 30;

/// Read-only conflict detection against the stored bookings of one slot.
///
/// A trailing 30-minute buffer is applied to the proposal's end only: a
/// candidate that starts inside that buffer still conflicts, but nothing is
/// demanded of the time before the proposal's start. The asymmetry is
/// deliberate and matches the booking rules this service enforces elsewhere.
pub struct ConflictCheckService {
    store: Arc<PostgrestClient>,
}

impl ConflictCheckService {
    pub fn new(store: Arc<PostgrestClient>) -> Self {
        Self { store }
    }

    /// True iff an active booking on this slot's date blocks the proposed
    /// [start, end) interval.
    pub async fn has_conflict(
        &self,
        slot: &AvailabilitySlot,
        proposed_start: NaiveTime,
        proposed_end: NaiveTime,
        exclude_booking_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, BookingError> {
        debug!(
            "Checking conflicts on slot {} for [{}, {})",
            slot.id, proposed_start, proposed_end
        );

        let candidates = self
            .active_bookings(slot, exclude_booking_id, auth_token)
            .await?;

        // If the buffer would cross midnight no candidate can entirely
        // follow it, so only the "entirely precedes" exclusion remains.
        let buffered_end = add_minutes(proposed_end, BUFFER_MINUTES).ok();

        let conflict = candidates
            .iter()
            .any(|candidate| blocks(candidate, proposed_start, buffered_end));

        if conflict {
            warn!(
                "Conflict detected on slot {} for [{}, {})",
                slot.id, proposed_start, proposed_end
            );
        }

        Ok(conflict)
    }

    async fn active_bookings(
        &self,
        slot: &AvailabilitySlot,
        exclude_booking_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        let mut query_parts = vec![
            format!("slot_id=eq.{}", slot.id),
            format!("date=eq.{}", slot.date),
            "status=eq.booked".to_string(),
        ];

        if let Some(exclude_id) = exclude_booking_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/bookings?{}&order=start_time.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Booking>, _>>()
            .map_err(|e| BookingError::Store(format!("Failed to parse bookings: {}", e)))
    }
}

/// A candidate blocks the proposal unless it entirely precedes the
/// proposal's start or entirely follows the buffered end.
fn blocks(candidate: &Booking, proposed_start: NaiveTime, buffered_end: Option<NaiveTime>) -> bool {
    match buffered_end {
        Some(buffered) => intervals_overlap(
            candidate.start_time,
            candidate.end_time,
            proposed_start,
            buffered,
        ),
        // No representable buffered end: only the "entirely precedes"
        // exclusion applies.
        None => candidate.end_time > proposed_start,
    }
}
