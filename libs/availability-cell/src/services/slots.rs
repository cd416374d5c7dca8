// libs/availability-cell/src/services/slots.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use chrono_tz::Tz;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    AvailabilitySlot, ClientProfile, ClientWithAvailability, CreateSlotRequest,
    SlotError, WeeklyAvailabilityRequest,
};

pub struct SlotService {
    store: Arc<PostgrestClient>,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(PostgrestClient::new(config)),
        }
    }

    pub fn with_store(store: Arc<PostgrestClient>) -> Self {
        Self { store }
    }

    /// Publish a single availability slot for the owning client.
    pub async fn create_slot(
        &self,
        client_id: Uuid,
        request: CreateSlotRequest,
        auth_token: &str,
    ) -> Result<AvailabilitySlot, SlotError> {
        validate_slot_fields(
            request.start_time,
            request.end_time,
            &request.timezone,
            request.hourly_rate,
        )?;

        let slot = self
            .insert_slot(
                client_id,
                &request.date.to_string(),
                request.start_time,
                request.end_time,
                &request.timezone,
                request.hourly_rate,
                auth_token,
            )
            .await?;

        info!("Client {} published slot {} on {}", client_id, slot.id, slot.date);
        Ok(slot)
    }

    /// Bulk upload of one week's slots. Each entry must carry a date; the
    /// shared timezone from the envelope applies to every entry.
    pub async fn create_weekly(
        &self,
        client_id: Uuid,
        request: WeeklyAvailabilityRequest,
        auth_token: &str,
    ) -> Result<Vec<AvailabilitySlot>, SlotError> {
        if request.weekly_availability.is_empty() {
            return Err(SlotError::MissingField(
                "weekly_availability".to_string(),
            ));
        }

        // Validate every entry before touching the store so a bad entry in
        // the middle does not leave a half-written week behind.
        for entry in &request.weekly_availability {
            if entry.date.is_none() {
                return Err(SlotError::MissingField("date".to_string()));
            }
            validate_slot_fields(
                entry.start_time,
                entry.end_time,
                &request.timezone,
                entry.price_per_hour,
            )?;
        }

        let mut created = Vec::with_capacity(request.weekly_availability.len());
        for entry in &request.weekly_availability {
            let date = entry.date.expect("validated above");
            let slot = self
                .insert_slot(
                    client_id,
                    &date.to_string(),
                    entry.start_time,
                    entry.end_time,
                    &request.timezone,
                    entry.price_per_hour,
                    auth_token,
                )
                .await?;
            created.push(slot);
        }

        info!(
            "Client {} published {} weekly slots",
            client_id,
            created.len()
        );
        Ok(created)
    }

    /// Fetch one slot by id.
    pub async fn get_slot(
        &self,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<AvailabilitySlot, SlotError> {
        let path = format!("/rest/v1/availability_slots?id=eq.{}", slot_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(SlotError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slot: {}", e)))
    }

    /// All slots owned by one client, soonest first.
    pub async fn list_client_slots(
        &self,
        client_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AvailabilitySlot>, SlotError> {
        let path = format!(
            "/rest/v1/availability_slots?client_id=eq.{}&order=date.asc,start_time.asc",
            client_id
        );
        self.fetch_slots(&path, auth_token).await
    }

    /// Every client that currently has published slots, with their slots
    /// attached. Clients with no slots are omitted.
    pub async fn clients_with_availability(
        &self,
        auth_token: &str,
    ) -> Result<Vec<ClientWithAvailability>, SlotError> {
        let slots = self
            .fetch_slots(
                "/rest/v1/availability_slots?order=client_id.asc,date.asc",
                auth_token,
            )
            .await?;

        if slots.is_empty() {
            return Ok(vec![]);
        }

        let mut by_client: BTreeMap<Uuid, Vec<AvailabilitySlot>> = BTreeMap::new();
        for slot in slots {
            by_client.entry(slot.client_id).or_default().push(slot);
        }

        let ids: Vec<String> = by_client.keys().map(|id| id.to_string()).collect();
        let path = format!(
            "/rest/v1/profiles?id=in.({})&role=eq.client",
            ids.join(",")
        );
        let profiles: Vec<ClientProfile> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        let result = profiles
            .into_iter()
            .filter_map(|profile| {
                by_client.remove(&profile.id).map(|availability| ClientWithAvailability {
                    client_id: profile.id,
                    username: profile.username,
                    email: profile.email,
                    availability,
                })
            })
            .collect();

        Ok(result)
    }

    async fn insert_slot(
        &self,
        client_id: Uuid,
        date: &str,
        start_time: NaiveTime,
        end_time: NaiveTime,
        timezone: &str,
        hourly_rate: Decimal,
        auth_token: &str,
    ) -> Result<AvailabilitySlot, SlotError> {
        let now = Utc::now();
        let body = json!({
            "id": Uuid::new_v4(),
            "client_id": client_id,
            "date": date,
            "start_time": start_time,
            "end_time": end_time,
            "timezone": timezone,
            "hourly_rate": hourly_rate,
            "created_at": now,
            "updated_at": now,
        });

        debug!("Inserting availability slot for client {} on {}", client_id, date);

        let mut headers = HeaderMap::new();
        headers.insert("prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/availability_slots",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| SlotError::DatabaseError("Slot insert returned no row".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slot: {}", e)))
    }

    async fn fetch_slots(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<AvailabilitySlot>, SlotError> {
        let result: Vec<Value> = self
            .store
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilitySlot>, _>>()
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slots: {}", e)))
    }
}

fn validate_slot_fields(
    start_time: NaiveTime,
    end_time: NaiveTime,
    timezone: &str,
    hourly_rate: Decimal,
) -> Result<(), SlotError> {
    if start_time >= end_time {
        return Err(SlotError::InvalidTimeRange(format!(
            "start time {} must be before end time {}",
            start_time, end_time
        )));
    }

    if timezone.parse::<Tz>().is_err() {
        return Err(SlotError::InvalidTimezone(timezone.to_string()));
    }

    if hourly_rate <= Decimal::ZERO {
        return Err(SlotError::InvalidRate(format!(
            "hourly rate must be positive, got {}",
            hourly_rate
        )));
    }
    if hourly_rate.normalize().scale() > 2 {
        return Err(SlotError::InvalidRate(format!(
            "hourly rate must have at most 2 decimal places, got {}",
            hourly_rate
        )));
    }

    Ok(())
}
