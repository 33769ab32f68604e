use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::appointment::{ActiveStatus, Appointment, AppointmentStatus, NewAppointment};

use crate::appointments::{AppointmentStore, StoreError};

/// Process-local appointment store. Inserts re-check overlap under the write
/// lock, so two racing inserts for the same window cannot both land.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_appointments(appointments: Vec<Appointment>) -> Self {
        Self {
            appointments: RwLock::new(appointments.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn find_overlapping(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StoreError> {
        let guard = self.appointments.read().await;
        let mut matches: Vec<Appointment> = guard
            .values()
            .filter(|a| a.professional_id == professional_id && a.status == status)
            .filter(|a| a.overlaps(start, end))
            .cloned()
            .collect();
        matches.sort_by_key(|a| a.start_time);
        Ok(matches)
    }

    async fn find_in_range(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StoreError> {
        let guard = self.appointments.read().await;
        let mut matches: Vec<Appointment> = guard
            .values()
            .filter(|a| a.professional_id == professional_id && a.status == status)
            .filter(|a| a.start_time >= start && a.start_time < end)
            .cloned()
            .collect();
        matches.sort_by_key(|a| a.start_time);
        Ok(matches)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        active_status: ActiveStatus,
    ) -> Result<Vec<Appointment>, StoreError> {
        let guard = self.appointments.read().await;
        let mut matches: Vec<Appointment> = guard
            .values()
            .filter(|a| a.user_id == user_id && a.active_status == active_status)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(matches)
    }

    async fn insert(
        &self,
        appointment: NewAppointment,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let mut guard = self.appointments.write().await;

        let taken = guard.values().any(|existing| {
            existing.professional_id == appointment.professional_id
                && existing.is_booked()
                && existing.overlaps(appointment.start_time, appointment.end_time)
        });
        if taken {
            return Err(StoreError::Overlap);
        }

        let record = appointment.into_appointment(now);
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let mut guard = self.appointments.write().await;
        let record = guard.get_mut(&id).ok_or(StoreError::NotFound)?;
        if record.status != from {
            return Err(StoreError::StatusChanged);
        }
        record.status = to;
        record.updated_at = now;
        Ok(record.clone())
    }
}
