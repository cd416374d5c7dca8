// libs/notification-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::{Extension, State}, Json};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::{ApiError, ValidationReason};

use crate::models::{NotificationError, NotifyBookingRequest};
use crate::services::notify::NotificationService;

/// Manual re-send of the confirmation emails for a booking.
#[axum::debug_handler]
pub async fn notify_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
    Json(request): Json<NotifyBookingRequest>,
) -> Result<Json<Value>, ApiError> {
    let booking_id = request.booking_id.ok_or_else(|| {
        ApiError::validation(ValidationReason::MissingField, "Missing field: booking_id")
    })?;

    let service = NotificationService::new(&state);
    service
        .notify_booking_created(booking_id, Some(auth.token()))
        .await
        .map_err(|e| match e {
            NotificationError::BookingNotFound => {
                ApiError::NotFound("Booking not found".to_string())
            }
            NotificationError::MissingField(field) => ApiError::validation(
                ValidationReason::MissingField,
                format!("Missing field: {}", field),
            ),
            NotificationError::Mail(msg) => ApiError::ExternalService(msg),
            NotificationError::Store(msg) => ApiError::Database(msg),
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Emails sent successfully"
    })))
}
