use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use shared_models::appointment::{ActiveStatus, Appointment, AppointmentStatus, NewAppointment};

use crate::supabase::{SupabaseApiError, SupabaseClient};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Appointment overlaps an existing booking")]
    Overlap,

    #[error("Appointment is no longer in the expected status")]
    StatusChanged,

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<SupabaseApiError>() {
            Some(api) if api.is_conflict() => StoreError::Overlap,
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Durable record of appointments.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Appointments in `status` whose window strictly overlaps `[start, end)`.
    async fn find_overlapping(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Appointments in `status` starting within `[start, end)`, ascending by start.
    async fn find_in_range(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// A user's appointments, most recent start first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        active_status: ActiveStatus,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn insert(
        &self,
        appointment: NewAppointment,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError>;

    /// Moves a record from `from` to `to`. Fails with `StatusChanged` when
    /// the stored status is no longer `from`.
    async fn update_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError>;
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn select(&self, query: String) -> Result<Vec<Appointment>, StoreError> {
        let path = format!("/rest/v1/appointments?{}", query);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        debug!("Fetching appointment: {}", id);
        let rows = self.select(format!("id=eq.{}", id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_overlapping(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StoreError> {
        debug!("Checking overlap for professional {} from {} to {}", professional_id, start, end);
        self.select(format!(
            "professional_id=eq.{}&status=eq.{}&start_time=lt.{}&end_time=gt.{}",
            professional_id,
            status,
            timestamp(end),
            timestamp(start)
        ))
        .await
    }

    async fn find_in_range(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.select(format!(
            "professional_id=eq.{}&status=eq.{}&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            professional_id,
            status,
            timestamp(start),
            timestamp(end)
        ))
        .await
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        active_status: ActiveStatus,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.select(format!(
            "user_id=eq.{}&active_status=eq.{}&order=start_time.desc",
            user_id, active_status
        ))
        .await
    }

    async fn insert(
        &self,
        appointment: NewAppointment,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let record = appointment.into_appointment(now);
        let body = serde_json::to_value(&record)
            .map_err(|e| StoreError::Backend(format!("Failed to encode appointment: {}", e)))?;

        let rows: Vec<Appointment> = self
            .supabase
            .request_returning(Method::POST, "/rest/v1/appointments", body)
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Insert returned no rows".to_string()))
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&status=eq.{}", id, from);
        let body = json!({
            "status": to,
            "updated_at": timestamp(now),
        });

        let rows: Vec<Appointment> = self
            .supabase
            .request_returning(Method::PATCH, &path, body)
            .await?;

        // No row matched the status filter: it moved on since it was read.
        rows.into_iter().next().ok_or(StoreError::StatusChanged)
    }
}
