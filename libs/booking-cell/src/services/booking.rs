// libs/booking-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::auth::{AuthUser, Role};
use shared_utils::clock::{Clock, SystemClock};

use availability_cell::models::{AvailabilitySlot, SlotError};
use availability_cell::services::slots::SlotService;
use notification_cell::services::notify::NotificationService;

use crate::models::{
    Booking, BookingError, BookingStatus, CreateBookingRequest, UpdateBookingRequest,
};
use crate::services::conflict::ConflictCheckService;
use crate::services::guard::BookingGuardService;
use crate::services::time::{add_minutes, localize, resolve_timezone, TimeError};

const DEFAULT_DURATION_MINUTES: i64 = 30;
const LOCKOUT_HOURS: i64 = 12;
const MAX_CREATE_ATTEMPTS: u32 = 3;

pub struct BookingLifecycleService {
    config: AppConfig,
    store: Arc<PostgrestClient>,
    conflict_service: ConflictCheckService,
    guard: BookingGuardService,
    slot_service: SlotService,
    clock: Arc<dyn Clock>,
}

impl BookingLifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// The clock is injected so the 12-hour lockout window can be pinned in
    /// tests.
    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(PostgrestClient::new(config));
        Self {
            config: config.clone(),
            conflict_service: ConflictCheckService::new(Arc::clone(&store)),
            guard: BookingGuardService::new(Arc::clone(&store)),
            slot_service: SlotService::with_store(Arc::clone(&store)),
            store,
            clock,
        }
    }

    /// Reserve part of a slot. Validates bounds and conflicts, then inserts
    /// under the per-slot lock so concurrent overlapping requests cannot
    /// both succeed. A confirmation email is dispatched after the commit
    /// and never affects the outcome.
    pub async fn create_booking(
        &self,
        user_id: Uuid,
        request: CreateBookingRequest,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        info!(
            "Booking request from user {} on slot {}",
            user_id, request.availability_id
        );

        let slot = self.resolve_slot(request.availability_id, auth_token).await?;

        let duration = request.duration.unwrap_or(DEFAULT_DURATION_MINUTES);
        if duration <= 0 {
            return Err(BookingError::InvalidTime(format!(
                "duration must be positive, got {}",
                duration
            )));
        }

        let requested_start = request.start_time.unwrap_or(slot.start_time);
        let requested_end = match request.end_time {
            Some(end) => end,
            None => add_minutes(requested_start, duration)?,
        };

        // Pin everything to the slot's zone on the slot's date before
        // comparing; a malformed zone or a DST gap fails here.
        let tz = resolve_timezone(&slot.timezone)?;
        let slot_start = localize(slot.date, slot.start_time, tz)?;
        let slot_end = localize(slot.date, slot.end_time, tz)?;
        let booking_start = localize(slot.date, requested_start, tz)?;
        let booking_end = localize(slot.date, requested_end, tz)?;

        if !(slot_start <= booking_start && booking_start < booking_end && booking_end <= slot_end)
        {
            return Err(BookingError::OutOfRange);
        }

        if self
            .conflict_service
            .has_conflict(&slot, requested_start, requested_end, None, auth_token)
            .await?
        {
            return Err(BookingError::Conflict);
        }

        // Stored times are wall-clock, so the stored duration is wall-clock
        // too; a DST transition inside the interval must not skew it.
        let duration_minutes = (requested_end - requested_start).num_minutes() as i32;

        let booking = self
            .guarded_insert(
                user_id,
                &slot,
                requested_start,
                requested_end,
                duration_minutes,
                auth_token,
            )
            .await?;

        info!("Booking {} created on slot {}", booking.id, slot.id);

        self.dispatch_confirmation(booking.id, auth_token);

        Ok(booking)
    }

    /// Cancel or reschedule. Authorization and the 12-hour lockout are
    /// checked before branching on the action, so both mutations are
    /// blocked inside the window.
    pub async fn update_booking(
        &self,
        booking_id: Uuid,
        actor: &AuthUser,
        request: UpdateBookingRequest,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        debug!("Updating booking {}", booking_id);

        let booking = self.get_booking(booking_id, auth_token).await?;
        let slot = self.resolve_slot(booking.slot_id, auth_token).await?;

        if actor.id != booking.user_id && actor.id != slot.client_id {
            return Err(BookingError::Forbidden);
        }

        let tz = resolve_timezone(&slot.timezone)?;
        let appointment_instant = localize(slot.date, slot.start_time, tz)?;

        let now = self.clock.now_utc();
        if appointment_instant.with_timezone(&Utc) - now < ChronoDuration::hours(LOCKOUT_HOURS) {
            return Err(BookingError::Lockout);
        }

        // A terminal booking gets an explicit refusal naming its status, not
        // a silent no-op.
        if !booking.status.is_active() {
            return Err(BookingError::InvalidStatus(booking.status));
        }

        match request {
            UpdateBookingRequest::Cancel => {
                let cancelled = self
                    .patch_booking(booking_id, json!({ "status": "cancelled" }), auth_token)
                    .await?;
                info!("Booking {} cancelled", booking_id);
                Ok(cancelled)
            }
            UpdateBookingRequest::Reschedule { new_slot_id } => {
                // Only the requester may move their booking elsewhere.
                if actor.id != booking.user_id {
                    return Err(BookingError::Forbidden);
                }

                let new_slot = self.resolve_slot(new_slot_id, auth_token).await?;
                self.validate_against_slot(&booking, &new_slot, auth_token).await?;

                let rescheduled = self
                    .patch_booking(
                        booking_id,
                        json!({
                            "slot_id": new_slot.id,
                            "date": new_slot.date,
                            "status": "rescheduled",
                        }),
                        auth_token,
                    )
                    .await?;
                info!(
                    "Booking {} rescheduled from slot {} to slot {}",
                    booking_id, slot.id, new_slot.id
                );
                Ok(rescheduled)
            }
        }
    }

    pub async fn get_booking(
        &self,
        booking_id: Uuid,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        let row = result.into_iter().next().ok_or(BookingError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| BookingError::Store(format!("Failed to parse booking: {}", e)))
    }

    /// Fetch one booking, visible to its requester, the slot owner, or an
    /// admin.
    pub async fn get_booking_authorized(
        &self,
        booking_id: Uuid,
        actor: &AuthUser,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_booking(booking_id, auth_token).await?;

        if actor.role == Role::Admin || actor.id == booking.user_id {
            return Ok(booking);
        }

        let slot = self.resolve_slot(booking.slot_id, auth_token).await?;
        if actor.id == slot.client_id {
            Ok(booking)
        } else {
            Err(BookingError::Forbidden)
        }
    }

    /// Admins see everything, users their own bookings, clients the
    /// bookings placed against their slots.
    pub async fn list_bookings(
        &self,
        actor: &AuthUser,
        auth_token: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        match actor.role {
            Role::Admin => {
                self.fetch_bookings("/rest/v1/bookings?order=date.desc,start_time.desc", auth_token)
                    .await
            }
            Role::User => {
                let path = format!(
                    "/rest/v1/bookings?user_id=eq.{}&order=date.desc,start_time.desc",
                    actor.id
                );
                self.fetch_bookings(&path, auth_token).await
            }
            Role::Client => {
                let slots = self
                    .slot_service
                    .list_client_slots(actor.id, auth_token)
                    .await
                    .map_err(map_slot_error)?;

                if slots.is_empty() {
                    return Ok(vec![]);
                }

                let ids: Vec<String> = slots.iter().map(|s| s.id.to_string()).collect();
                let path = format!(
                    "/rest/v1/bookings?slot_id=in.({})&order=date.desc,start_time.desc",
                    ids.join(",")
                );
                self.fetch_bookings(&path, auth_token).await
            }
        }
    }

    // ==============================================================================
    // PRIVATE HELPERS
    // ==============================================================================

    async fn resolve_slot(
        &self,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<AvailabilitySlot, BookingError> {
        self.slot_service
            .get_slot(slot_id, auth_token)
            .await
            .map_err(map_slot_error)
    }

    /// Bounds and conflict validation of a booking's interval against a
    /// slot, used when rescheduling.
    async fn validate_against_slot(
        &self,
        booking: &Booking,
        slot: &AvailabilitySlot,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        let tz = resolve_timezone(&slot.timezone)?;
        let slot_start = localize(slot.date, slot.start_time, tz)?;
        let slot_end = localize(slot.date, slot.end_time, tz)?;
        let booking_start = localize(slot.date, booking.start_time, tz)?;
        let booking_end = localize(slot.date, booking.end_time, tz)?;

        if !(slot_start <= booking_start && booking_start < booking_end && booking_end <= slot_end)
        {
            return Err(BookingError::OutOfRange);
        }

        if self
            .conflict_service
            .has_conflict(
                slot,
                booking.start_time,
                booking.end_time,
                Some(booking.id),
                auth_token,
            )
            .await?
        {
            return Err(BookingError::Conflict);
        }

        Ok(())
    }

    async fn guarded_insert(
        &self,
        user_id: Uuid,
        slot: &AvailabilitySlot,
        start_time: chrono::NaiveTime,
        end_time: chrono::NaiveTime,
        duration_minutes: i32,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let lock_key = BookingGuardService::lock_key(slot.id, slot.date);

        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            if self.guard.acquire(&lock_key, slot.id).await? {
                // Re-check under the lock: another writer may have committed
                // between the pre-check and here.
                let conflict = self
                    .conflict_service
                    .has_conflict(slot, start_time, end_time, None, auth_token)
                    .await;

                let result = match conflict {
                    Ok(true) => Err(BookingError::Conflict),
                    Ok(false) => {
                        self.insert_booking(
                            user_id,
                            slot,
                            start_time,
                            end_time,
                            duration_minutes,
                            auth_token,
                        )
                        .await
                    }
                    Err(e) => Err(e),
                };

                // The lock row expires on its own; a failed release must
                // not turn a committed insert into an error.
                if let Err(e) = self.guard.release(&lock_key).await {
                    warn!("Lock release failed for {}: {}", lock_key, e);
                }
                return result;
            }

            warn!(
                "Slot {} is locked, retrying booking attempt {}/{}",
                slot.id, attempt, MAX_CREATE_ATTEMPTS
            );
            tokio::time::sleep(tokio::time::Duration::from_millis(100 * attempt as u64)).await;
        }

        Err(BookingError::Conflict)
    }

    async fn insert_booking(
        &self,
        user_id: Uuid,
        slot: &AvailabilitySlot,
        start_time: chrono::NaiveTime,
        end_time: chrono::NaiveTime,
        duration_minutes: i32,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let now = Utc::now();
        let body = json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "slot_id": slot.id,
            "date": slot.date,
            "start_time": start_time,
            "end_time": end_time,
            "status": "booked",
            "duration_minutes": duration_minutes,
            "created_at": now,
            "updated_at": now,
        });

        let mut headers = HeaderMap::new();
        headers.insert("prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/bookings",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::Store("Booking insert returned no row".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| BookingError::Store(format!("Failed to parse booking: {}", e)))
    }

    async fn patch_booking(
        &self,
        booking_id: Uuid,
        mut body: Value,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        if let Some(map) = body.as_object_mut() {
            map.insert("updated_at".to_string(), json!(Utc::now()));
        }

        let mut headers = HeaderMap::new();
        headers.insert("prefer", HeaderValue::from_static("return=representation"));

        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let result: Vec<Value> = self
            .store
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        let row = result.into_iter().next().ok_or(BookingError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| BookingError::Store(format!("Failed to parse booking: {}", e)))
    }

    async fn fetch_bookings(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        let result: Vec<Value> = self
            .store
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Booking>, _>>()
            .map_err(|e| BookingError::Store(format!("Failed to parse bookings: {}", e)))
    }

    /// Fire-and-forget confirmation emails. Delivery failures are logged
    /// and never surfaced to the booking caller.
    fn dispatch_confirmation(&self, booking_id: Uuid, auth_token: &str) {
        let config = self.config.clone();
        let token = auth_token.to_string();
        tokio::spawn(async move {
            let notifier = NotificationService::new(&config);
            if let Err(e) = notifier.notify_booking_created(booking_id, Some(&token)).await {
                warn!("Confirmation email for booking {} failed: {}", booking_id, e);
            }
        });
    }
}

impl From<TimeError> for BookingError {
    fn from(error: TimeError) -> Self {
        match error {
            TimeError::CrossesMidnight { .. } => BookingError::InvalidTime(error.to_string()),
            TimeError::UnknownTimezone(_) | TimeError::NonexistentLocalTime { .. } => {
                BookingError::Timezone(error.to_string())
            }
        }
    }
}

fn map_slot_error(error: SlotError) -> BookingError {
    match error {
        SlotError::NotFound => BookingError::SlotNotFound,
        other => BookingError::Store(other.to_string()),
    }
}
