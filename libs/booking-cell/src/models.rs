// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// BOOKING MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Booked,
    Completed,
    Cancelled,
    Rescheduled,
}

impl BookingStatus {
    /// Only `booked` occupies time on a slot; every other status is terminal
    /// for that occupancy.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Booked)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Booked => "booked",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rescheduled => "rescheduled",
        };
        write!(f, "{}", s)
    }
}

/// A reservation of part of an availability slot. Times are wall-clock in
/// the slot's timezone, on the date copied from the slot when the booking
/// was created (or last rescheduled).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub slot_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub availability_id: Uuid,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    /// Used to derive `end_time` when it is absent. Defaults to 30 minutes.
    pub duration: Option<i64>,
}

/// The two mutations a booking supports after creation. A tagged enum keeps
/// the action set closed: anything else fails deserialization at the door.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum UpdateBookingRequest {
    Cancel,
    Reschedule { new_slot_id: Uuid },
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,

    #[error("Availability slot not found")]
    SlotNotFound,

    #[error("Booking times must be within the slot's availability range")]
    OutOfRange,

    #[error("This time overlaps with an existing booking")]
    Conflict,

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid booking time: {0}")]
    InvalidTime(String),

    #[error("Booking cannot be modified in status {0}")]
    InvalidStatus(BookingStatus),

    #[error("Not authorized to modify this booking")]
    Forbidden,

    #[error("Changes must be made at least 12 hours before the appointment")]
    Lockout,

    #[error("Timezone error: {0}")]
    Timezone(String),

    #[error("Store error: {0}")]
    Store(String),
}
