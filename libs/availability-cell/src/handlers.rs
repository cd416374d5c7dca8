// libs/availability-cell/src/handlers.rs
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

use crate::models::{CreateSlotRequest, SlotError, WeeklyAvailabilityRequest};
use crate::services::slots::SlotService;

fn require_client(user: &AuthUser) -> Result<(), ApiError> {
    match user.role {
        Role::Client => Ok(()),
        Role::User | Role::Admin => Err(ApiError::Forbidden(
            "Only clients can manage availability".to_string(),
        )),
    }
}

fn map_slot_error(error: SlotError) -> ApiError {
    match error {
        SlotError::NotFound => ApiError::NotFound("Availability slot not found".to_string()),
        SlotError::InvalidTimezone(tz) => ApiError::validation(
            ValidationReason::Timezone,
            format!("Invalid timezone: {}", tz),
        ),
        SlotError::MissingField(field) => ApiError::validation(
            ValidationReason::MissingField,
            format!("Missing field: {}", field),
        ),
        SlotError::InvalidTimeRange(msg) => {
            ApiError::validation(ValidationReason::Validation, msg)
        }
        SlotError::InvalidRate(msg) => ApiError::validation(ValidationReason::Validation, msg),
        SlotError::DatabaseError(msg) => ApiError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, ApiError> {
    require_client(&user)?;

    let service = SlotService::new(&state);
    let slot = service
        .create_slot(user.id, request, auth.token())
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!({
        "success": true,
        "slot": slot
    })))
}

#[axum::debug_handler]
pub async fn list_my_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    require_client(&user)?;

    let service = SlotService::new(&state);
    let slots = service
        .list_client_slots(user.id, auth.token())
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!(slots)))
}

#[axum::debug_handler]
pub async fn create_weekly_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<WeeklyAvailabilityRequest>,
) -> Result<Json<Value>, ApiError> {
    require_client(&user)?;

    let service = SlotService::new(&state);
    let slots = service
        .create_weekly(user.id, request, auth.token())
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Weekly availability saved successfully",
        "slots": slots
    })))
}

/// Any authenticated caller may browse which clients currently offer slots.
#[axum::debug_handler]
pub async fn list_clients_with_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let service = SlotService::new(&state);
    let clients = service
        .clients_with_availability(auth.token())
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!(clients)))
}

#[axum::debug_handler]
pub async fn get_client_availability(
    State(state): State<Arc<AppConfig>>,
    Path(client_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let service = SlotService::new(&state);
    let slots = service
        .list_client_slots(client_id, auth.token())
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!(slots)))
}
