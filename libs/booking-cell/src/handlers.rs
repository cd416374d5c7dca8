// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};
use shared_models::error::{ApiError, ValidationReason};

use crate::models::{BookingError, CreateBookingRequest, UpdateBookingRequest};
use crate::services::booking::BookingLifecycleService;

fn map_booking_error(error: BookingError) -> ApiError {
    match error {
        BookingError::NotFound => ApiError::NotFound("Booking not found".to_string()),
        BookingError::SlotNotFound => {
            ApiError::NotFound("Availability slot not found".to_string())
        }
        BookingError::OutOfRange => ApiError::validation(
            ValidationReason::OutOfRange,
            "Booking times must be within the slot's availability range",
        ),
        BookingError::Conflict => ApiError::validation(
            ValidationReason::Conflict,
            "This time overlaps with an existing booking",
        ),
        BookingError::MissingField(field) => ApiError::validation(
            ValidationReason::MissingField,
            format!("Missing field: {}", field),
        ),
        BookingError::InvalidTime(msg) => {
            ApiError::validation(ValidationReason::Validation, msg)
        }
        BookingError::InvalidStatus(status) => ApiError::validation(
            ValidationReason::Validation,
            format!("Booking cannot be modified in status {}", status),
        ),
        BookingError::Forbidden => {
            ApiError::Forbidden("Not authorized to modify this booking".to_string())
        }
        BookingError::Lockout => ApiError::validation(
            ValidationReason::Lockout,
            "Changes must be made at least 12 hours before the appointment",
        ),
        BookingError::Timezone(msg) => ApiError::validation(ValidationReason::Timezone, msg),
        BookingError::Store(msg) => ApiError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<Value>, ApiError> {
    // Only end users reserve slots; clients publish them and admins observe.
    match user.role {
        Role::User => {}
        Role::Client | Role::Admin => {
            return Err(ApiError::Forbidden(
                "Only users can book availability slots".to_string(),
            ));
        }
    }

    let service = BookingLifecycleService::new(&state);
    let booking = service
        .create_booking(user.id, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Booking created successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let service = BookingLifecycleService::new(&state);
    let bookings = service
        .list_bookings(&user, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(bookings)))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let service = BookingLifecycleService::new(&state);
    let booking = service
        .get_booking_authorized(booking_id, &user, auth.token())
        .await
        .map_err(|e| match e {
            BookingError::Forbidden => {
                ApiError::Forbidden("Not authorized to view this booking".to_string())
            }
            other => map_booking_error(other),
        })?;

    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn update_booking(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateBookingRequest>,
) -> Result<Json<Value>, ApiError> {
    let service = BookingLifecycleService::new(&state);
    let booking = service
        .update_booking(booking_id, &user, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    let message = match booking.status {
        crate::models::BookingStatus::Cancelled => "Booking cancelled successfully",
        crate::models::BookingStatus::Rescheduled => "Booking rescheduled successfully",
        _ => "Booking updated successfully",
    };

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": message
    })))
}
