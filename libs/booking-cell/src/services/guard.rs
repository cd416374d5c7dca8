// libs/booking-cell/src/services/guard.rs
//
// Serialization guard for booking creation. Two concurrent requests for
// overlapping time on the same slot must not both succeed; the store's
// unique constraint on booking_locks.lock_key is the arbiter. The conflict
// re-check and the insert both run while the lock row is held.

use chrono::{Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::postgrest::PostgrestClient;

use crate::models::BookingError;

pub struct BookingGuardService {
    store: Arc<PostgrestClient>,
    lock_timeout_seconds: i64,
}

impl BookingGuardService {
    pub fn new(store: Arc<PostgrestClient>) -> Self {
        Self {
            store,
            lock_timeout_seconds: 30,
        }
    }

    /// One lock per (slot, date): coarser than per-interval, but bookings on
    /// one slot-day are rare enough that contention is the exception.
    pub fn lock_key(slot_id: Uuid, date: NaiveDate) -> String {
        format!("slot-{}-{}", slot_id, date)
    }

    /// Try to take the lock. Returns false when another holder has it and
    /// the row has not expired.
    pub async fn acquire(&self, lock_key: &str, slot_id: Uuid) -> Result<bool, BookingError> {
        if self.try_insert_lock(lock_key, slot_id).await? {
            return Ok(true);
        }

        // Lock row exists; a crashed holder may have left it behind.
        if self.cleanup_expired_lock(lock_key).await? {
            return self.try_insert_lock(lock_key, slot_id).await;
        }

        Ok(false)
    }

    pub async fn release(&self, lock_key: &str) -> Result<(), BookingError> {
        let _response: Value = self
            .store
            .request(
                Method::DELETE,
                &format!("/rest/v1/booking_locks?lock_key=eq.{}", lock_key),
                None,
                None,
            )
            .await
            .map_err(|e| BookingError::Store(format!("Lock release failed: {}", e)))?;

        debug!("Booking lock released: {}", lock_key);
        Ok(())
    }

    async fn try_insert_lock(&self, lock_key: &str, slot_id: Uuid) -> Result<bool, BookingError> {
        let now = Utc::now();
        let lock_data = json!({
            "lock_key": lock_key,
            "slot_id": slot_id,
            "acquired_at": now.to_rfc3339(),
            "expires_at": (now + Duration::seconds(self.lock_timeout_seconds)).to_rfc3339(),
            "holder": format!("booking-{}", Uuid::new_v4()),
        });

        // The unique constraint on lock_key rejects a second insert.
        match self
            .store
            .request::<Value>(Method::POST, "/rest/v1/booking_locks", None, Some(lock_data))
            .await
        {
            Ok(_) => {
                debug!("Booking lock acquired: {}", lock_key);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Delete the lock row if it has expired. Returns true when a retry is
    /// worth attempting.
    async fn cleanup_expired_lock(&self, lock_key: &str) -> Result<bool, BookingError> {
        let now = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let path = format!(
            "/rest/v1/booking_locks?lock_key=eq.{}&expires_at=lt.{}",
            lock_key,
            urlencoding::encode(&now)
        );

        match self.store.request::<Value>(Method::DELETE, &path, None, None).await {
            Ok(_) => {
                debug!("Cleaned up expired booking lock: {}", lock_key);
                Ok(true)
            }
            Err(e) => {
                warn!("Expired lock cleanup failed for {}: {}", lock_key, e);
                Ok(false)
            }
        }
    }
}
