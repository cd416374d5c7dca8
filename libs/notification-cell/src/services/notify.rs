// libs/notification-cell/src/services/notify.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{BookingRecord, NotificationError, ProfileRecord, SlotRecord};

/// Best-effort booking confirmation emails: one to the requester, one to
/// the slot's owning client. Safe to call more than once for the same
/// booking; the relay treats each send as an independent message.
pub struct NotificationService {
    store: Arc<PostgrestClient>,
    mailer: super::mailer::MailerClient,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(PostgrestClient::new(config)),
            mailer: super::mailer::MailerClient::new(config),
        }
    }

    pub async fn notify_booking_created(
        &self,
        booking_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<(), NotificationError> {
        let booking = self.load_booking(booking_id, auth_token).await?;
        let slot = self.load_slot(booking.slot_id, auth_token).await?;

        let requester = self.load_profile(booking.user_id, auth_token).await?;
        let client = self.load_profile(slot.client_id, auth_token).await?;

        let subject = format!("Booking Confirmation (Booking ID: {})", booking.id);
        let body = format!(
            "Hi {{name}},\n\n\
             A booking (ID: {}) has been confirmed for the service scheduled on {}\n\
             from {} to {}.\n\n\
             Thank you,\n\
             Slotbook Team",
            booking.id, booking.date, booking.start_time, booking.end_time
        );

        // Each recipient is attempted independently; one bounce must not
        // suppress the other email.
        let mut delivered = 0;
        for profile in [&requester, &client] {
            let Some(email) = profile.email.as_deref() else {
                warn!("No email on profile {}, skipping", profile.id);
                continue;
            };
            match self
                .mailer
                .send(email, &subject, &body.replace("{name}", &profile.username))
                .await
            {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Email to {} failed for booking {}: {}", email, booking.id, e),
            }
        }

        info!(
            "Booking {} confirmation: {} of 2 emails dispatched",
            booking.id, delivered
        );
        Ok(())
    }

    async fn load_booking(
        &self,
        booking_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<BookingRecord, NotificationError> {
        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| NotificationError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(NotificationError::BookingNotFound)?;
        serde_json::from_value(row)
            .map_err(|e| NotificationError::Store(format!("Failed to parse booking: {}", e)))
    }

    async fn load_slot(
        &self,
        slot_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<SlotRecord, NotificationError> {
        let path = format!("/rest/v1/availability_slots?id=eq.{}", slot_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| NotificationError::Store(e.to_string()))?;

        let row = result.into_iter().next().ok_or_else(|| {
            NotificationError::Store(format!("Slot {} missing for booking email", slot_id))
        })?;
        serde_json::from_value(row)
            .map_err(|e| NotificationError::Store(format!("Failed to parse slot: {}", e)))
    }

    async fn load_profile(
        &self,
        user_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<ProfileRecord, NotificationError> {
        let path = format!("/rest/v1/profiles?id=eq.{}", user_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| NotificationError::Store(e.to_string()))?;

        let row = result.into_iter().next().ok_or_else(|| {
            NotificationError::Store(format!("Profile {} missing for booking email", user_id))
        })?;
        serde_json::from_value(row)
            .map_err(|e| NotificationError::Store(format!("Failed to parse profile: {}", e)))
    }
}
