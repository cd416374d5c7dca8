// libs/notification-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Manual re-send request. `booking_id` stays optional in the wire type so
/// its absence surfaces as a field-level error rather than a 422.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyBookingRequest {
    pub booking_id: Option<Uuid>,
}

/// The slice of a booking row this cell needs for an email. Kept local so
/// the notification cell has no dependency on the booking cell.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub slot_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Booking not found")]
    BookingNotFound,

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Mail relay error: {0}")]
    Mail(String),

    #[error("Store error: {0}")]
    Store(String),
}
