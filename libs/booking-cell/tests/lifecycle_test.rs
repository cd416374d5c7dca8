use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::models::{BookingError, BookingStatus, UpdateBookingRequest};
use booking_cell::services::booking::BookingLifecycleService;
use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};
use shared_utils::test_utils::{FixedClock, TestConfig};

// The appointment under test starts 2026-03-10 09:00 UTC.
const APPOINTMENT_INSTANT: &str = "2026-03-10T09:00:00Z";

fn test_config(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.store_url = mock_server.uri();
    config
}

fn service_at(config: &AppConfig, now: &str) -> BookingLifecycleService {
    let instant: DateTime<Utc> = now.parse().unwrap();
    BookingLifecycleService::with_clock(config, Arc::new(FixedClock(instant)))
}

fn actor(id: Uuid, role: Role) -> AuthUser {
    AuthUser {
        id,
        email: Some("actor@example.com".to_string()),
        role,
        is_active: true,
    }
}

fn slot_row(slot_id: &Uuid, client_id: &Uuid, start: &str, end: &str) -> Value {
    json!({
        "id": slot_id,
        "client_id": client_id,
        "date": "2026-03-10",
        "start_time": start,
        "end_time": end,
        "timezone": "UTC",
        "hourly_rate": "50.00",
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z"
    })
}

fn booking_row(booking_id: &Uuid, user_id: &Uuid, slot_id: &Uuid, status: &str) -> Value {
    json!({
        "id": booking_id,
        "user_id": user_id,
        "slot_id": slot_id,
        "date": "2026-03-10",
        "start_time": "09:00:00",
        "end_time": "09:30:00",
        "status": status,
        "duration_minutes": 30,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z"
    })
}

struct Fixture {
    booking_id: Uuid,
    user_id: Uuid,
    client_id: Uuid,
}

/// Mounts the booking row (with the given status) and its slot.
async fn setup_update_mocks(mock_server: &MockServer, status: &str) -> Fixture {
    let fixture = Fixture {
        booking_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
    };
    let slot_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", fixture.booking_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            booking_row(&fixture.booking_id, &fixture.user_id, &slot_id, status)
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            slot_row(&slot_id, &fixture.client_id, "09:00:00", "17:00:00")
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            booking_row(&fixture.booking_id, &fixture.user_id, &slot_id, "cancelled")
        ])))
        .mount(mock_server)
        .await;

    fixture
}

#[tokio::test]
async fn cancel_succeeds_just_outside_lockout_window() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let fixture = setup_update_mocks(&mock_server, "booked").await;

    // 12 hours and 1 minute before the appointment
    let service = service_at(&config, "2026-03-09T20:59:00Z");
    let requester = actor(fixture.user_id, Role::User);

    let result = service
        .update_booking(
            fixture.booking_id,
            &requester,
            UpdateBookingRequest::Cancel,
            "test-token",
        )
        .await
        .unwrap();

    assert_eq!(result.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn cancel_blocked_inside_lockout_window() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let fixture = setup_update_mocks(&mock_server, "booked").await;

    // 11 hours and 59 minutes before the appointment
    let service = service_at(&config, "2026-03-09T21:01:00Z");
    let requester = actor(fixture.user_id, Role::User);

    let result = service
        .update_booking(
            fixture.booking_id,
            &requester,
            UpdateBookingRequest::Cancel,
            "test-token",
        )
        .await;

    assert_matches!(result, Err(BookingError::Lockout));
}

#[tokio::test]
async fn reschedule_blocked_inside_lockout_window() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let fixture = setup_update_mocks(&mock_server, "booked").await;

    let service = service_at(&config, "2026-03-09T21:01:00Z");
    let requester = actor(fixture.user_id, Role::User);

    // The lockout check runs before branching on the action
    let result = service
        .update_booking(
            fixture.booking_id,
            &requester,
            UpdateBookingRequest::Reschedule {
                new_slot_id: Uuid::new_v4(),
            },
            "test-token",
        )
        .await;

    assert_matches!(result, Err(BookingError::Lockout));
}

#[tokio::test]
async fn second_cancel_reports_terminal_status() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let fixture = setup_update_mocks(&mock_server, "cancelled").await;

    let service = service_at(&config, "2026-03-09T20:00:00Z");
    let requester = actor(fixture.user_id, Role::User);

    let result = service
        .update_booking(
            fixture.booking_id,
            &requester,
            UpdateBookingRequest::Cancel,
            "test-token",
        )
        .await;

    assert_matches!(result, Err(BookingError::InvalidStatus(BookingStatus::Cancelled)));
}

#[tokio::test]
async fn slot_owner_may_cancel() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let fixture = setup_update_mocks(&mock_server, "booked").await;

    let service = service_at(&config, "2026-03-09T20:00:00Z");
    let owner = actor(fixture.client_id, Role::Client);

    let result = service
        .update_booking(
            fixture.booking_id,
            &owner,
            UpdateBookingRequest::Cancel,
            "test-token",
        )
        .await
        .unwrap();

    assert_eq!(result.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn stranger_may_not_touch_the_booking() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let fixture = setup_update_mocks(&mock_server, "booked").await;

    let service = service_at(&config, "2026-03-09T20:00:00Z");
    let stranger = actor(Uuid::new_v4(), Role::User);

    let result = service
        .update_booking(
            fixture.booking_id,
            &stranger,
            UpdateBookingRequest::Cancel,
            "test-token",
        )
        .await;

    assert_matches!(result, Err(BookingError::Forbidden));
}

#[tokio::test]
async fn slot_owner_may_not_reschedule() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let fixture = setup_update_mocks(&mock_server, "booked").await;

    let service = service_at(&config, "2026-03-09T20:00:00Z");
    let owner = actor(fixture.client_id, Role::Client);

    let result = service
        .update_booking(
            fixture.booking_id,
            &owner,
            UpdateBookingRequest::Reschedule {
                new_slot_id: Uuid::new_v4(),
            },
            "test-token",
        )
        .await;

    assert_matches!(result, Err(BookingError::Forbidden));
}

#[tokio::test]
async fn reschedule_repoints_booking_to_new_slot() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let fixture = setup_update_mocks(&mock_server, "booked").await;

    let new_slot_id = Uuid::new_v4();
    let new_client_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            slot_row(&new_slot_id, &new_client_id, "08:00:00", "12:00:00")
        ])))
        .mount(&mock_server)
        .await;

    // No active bookings on the new slot
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("slot_id", format!("eq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Outranks the generic PATCH mock from the shared fixture
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", fixture.booking_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": fixture.booking_id,
            "user_id": fixture.user_id,
            "slot_id": new_slot_id,
            "date": "2026-03-10",
            "start_time": "09:00:00",
            "end_time": "09:30:00",
            "status": "rescheduled",
            "duration_minutes": 30,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }])))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    let service = service_at(&config, "2026-03-09T20:00:00Z");
    let requester = actor(fixture.user_id, Role::User);

    let result = service
        .update_booking(
            fixture.booking_id,
            &requester,
            UpdateBookingRequest::Reschedule { new_slot_id },
            "test-token",
        )
        .await
        .unwrap();

    assert_eq!(result.status, BookingStatus::Rescheduled);
    assert_eq!(result.slot_id, new_slot_id);
}

#[tokio::test]
async fn reschedule_validates_bounds_on_new_slot() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let fixture = setup_update_mocks(&mock_server, "booked").await;

    let new_slot_id = Uuid::new_v4();

    // New slot opens at 10:00, but the booking's interval is [09:00,09:30)
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            slot_row(&new_slot_id, &Uuid::new_v4(), "10:00:00", "12:00:00")
        ])))
        .mount(&mock_server)
        .await;

    let service = service_at(&config, "2026-03-09T20:00:00Z");
    let requester = actor(fixture.user_id, Role::User);

    let result = service
        .update_booking(
            fixture.booking_id,
            &requester,
            UpdateBookingRequest::Reschedule { new_slot_id },
            "test-token",
        )
        .await;

    assert_matches!(result, Err(BookingError::OutOfRange));
}

#[tokio::test]
async fn reschedule_detects_conflicts_on_new_slot() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let fixture = setup_update_mocks(&mock_server, "booked").await;

    let new_slot_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            slot_row(&new_slot_id, &Uuid::new_v4(), "08:00:00", "12:00:00")
        ])))
        .mount(&mock_server)
        .await;

    // An active booking already sits on the target interval
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("slot_id", format!("eq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "slot_id": new_slot_id,
            "date": "2026-03-10",
            "start_time": "09:00:00",
            "end_time": "10:00:00",
            "status": "booked",
            "duration_minutes": 60,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let service = service_at(&config, "2026-03-09T20:00:00Z");
    let requester = actor(fixture.user_id, Role::User);

    let result = service
        .update_booking(
            fixture.booking_id,
            &requester,
            UpdateBookingRequest::Reschedule { new_slot_id },
            "test-token",
        )
        .await;

    assert_matches!(result, Err(BookingError::Conflict));
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_at(&config, "2026-03-09T20:00:00Z");
    let requester = actor(Uuid::new_v4(), Role::User);

    let result = service
        .update_booking(
            Uuid::new_v4(),
            &requester,
            UpdateBookingRequest::Cancel,
            "test-token",
        )
        .await;

    assert_matches!(result, Err(BookingError::NotFound));
}

#[tokio::test]
async fn unresolvable_timezone_is_reported() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let booking_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            booking_row(&booking_id, &user_id, &slot_id, "booked")
        ])))
        .mount(&mock_server)
        .await;

    // Slot row carrying a zone the resolver cannot parse
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": slot_id,
            "client_id": Uuid::new_v4(),
            "date": "2026-03-10",
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "timezone": "Not/A_Zone",
            "hourly_rate": "50.00",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let service = service_at(&config, "2026-03-09T20:00:00Z");
    let requester = actor(user_id, Role::User);

    let result = service
        .update_booking(
            booking_id,
            &requester,
            UpdateBookingRequest::Cancel,
            "test-token",
        )
        .await;

    assert_matches!(result, Err(BookingError::Timezone(_)));
}
