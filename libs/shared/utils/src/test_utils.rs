use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};

use crate::clock::Clock;

pub struct TestConfig {
    pub jwt_secret: String,
    pub store_url: String,
    pub store_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            store_url: "http://localhost:54321".to_string(),
            store_api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_url: self.store_url.clone(),
            store_api_key: self.store_api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            mail_api_url: "http://localhost:54322".to_string(),
            mail_api_token: "test-mail-token".to_string(),
            mail_from_address: "bookings@test.example".to_string(),
        }
    }

}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub is_active: bool,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            role: "user".to_string(),
            is_active: true,
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: role.to_string(),
            is_active: true,
        }
    }

    pub fn user(email: &str) -> Self {
        Self::new(email, "user")
    }

    pub fn client(email: &str) -> Self {
        Self::new(email, "client")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: Some(self.email.clone()),
            role: Role::parse(&self.role).expect("test user role must be a known role"),
            is_active: self.is_active,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "is_active": user.is_active,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Clock pinned to one instant, for exercising the lockout window.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn availability_slot_response(slot_id: &str, client_id: &str) -> serde_json::Value {
        json!({
            "id": slot_id,
            "client_id": client_id,
            "date": "2026-03-10",
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "timezone": "UTC",
            "hourly_rate": "50.00",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        })
    }

    pub fn booking_response(booking_id: &str, user_id: &str, slot_id: &str) -> serde_json::Value {
        json!({
            "id": booking_id,
            "user_id": user_id,
            "slot_id": slot_id,
            "date": "2026-03-10",
            "start_time": "10:00:00",
            "end_time": "10:30:00",
            "status": "booked",
            "duration_minutes": 30,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        })
    }

    pub fn profile_response(user_id: &str, username: &str, email: &str, role: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "username": username,
            "email": email,
            "role": role
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.store_url, "http://localhost:54321");
        assert_eq!(app_config.store_api_key, "test-api-key");
        assert!(!app_config.jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::client("host@example.com");
        assert_eq!(user.email, "host@example.com");
        assert_eq!(user.role, "client");

        let auth_user = user.to_auth_user();
        assert_eq!(auth_user.email, Some(user.email.clone()));
        assert_eq!(auth_user.role, Role::Client);
        assert_eq!(auth_user.id, user.id);
        assert!(auth_user.is_active);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_jwt_round_trip_through_validation() {
        let user = TestUser::client("roundtrip@example.com");
        let secret = "another-test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        let validated = crate::jwt::validate_token(&token, secret).unwrap();
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.role, Role::Client);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let user = TestUser::new("ghost@example.com", "superuser");
        let secret = "another-test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        let result = crate::jwt::validate_token(&token, secret);
        assert!(result.is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let user = TestUser::default();
        let secret = "another-test-secret";
        let token = JwtTestUtils::create_expired_token(&user, secret);

        let result = crate::jwt::validate_token(&token, secret);
        assert!(result.is_err());
    }

    #[test]
    fn test_fixed_clock_returns_pinned_instant() {
        let instant = "2026-03-10T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let clock = FixedClock(instant);
        assert_eq!(clock.now_utc(), instant);
    }
}
