// libs/availability-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// A window of time a client offers for booking, on one calendar date,
/// expressed as wall-clock times in the slot's own timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
    pub hourly_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
    pub hourly_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyAvailabilityRequest {
    pub timezone: String,
    pub weekly_availability: Vec<WeeklyAvailabilityEntry>,
}

/// One entry of a weekly bulk upload. `date` stays optional in the wire type
/// so a missing value surfaces as a field-level validation error rather than
/// a deserialization failure for the whole payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyAvailabilityEntry {
    pub date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub price_per_hour: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientWithAvailability {
    pub client_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub availability: Vec<AvailabilitySlot>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SlotError {
    #[error("Availability slot not found")]
    NotFound,

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid hourly rate: {0}")]
    InvalidRate(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
