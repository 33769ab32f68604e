use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use professional_cell::store::ProfessionalStore;
use shared_config::AppConfig;
use shared_database::AppointmentStore;
use shared_models::appointment::{ActiveStatus, Appointment, AppointmentStatus};

use crate::models::{AppointmentError, BookAppointmentRequest, BookingRules};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::locks::BookingLocks;
use crate::services::validator::BookingValidator;

pub struct AppointmentBookingService {
    appointments: Arc<dyn AppointmentStore>,
    validator: BookingValidator,
    lifecycle: AppointmentLifecycleService,
    locks: BookingLocks,
}

impl AppointmentBookingService {
    pub fn new(
        config: &AppConfig,
        professionals: Arc<dyn ProfessionalStore>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        let rules = BookingRules {
            cancellation_notice_hours: config.cancellation_notice_hours,
            ..BookingRules::default()
        };

        Self {
            lifecycle: AppointmentLifecycleService::new(rules.cancellation_notice_hours),
            validator: BookingValidator::new(professionals, Arc::clone(&appointments), rules),
            locks: BookingLocks::new(),
            appointments,
        }
    }

    /// The caller's active appointments, most recent first.
    pub async fn list_appointments(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self
            .appointments
            .list_for_user(user_id, ActiveStatus::Active)
            .await?;
        debug!("Found {} appointments for user {}", appointments.len(), user_id);
        Ok(appointments)
    }

    /// Validate and persist a booking. The per-professional lock is held from
    /// the conflict check through the insert.
    #[instrument(skip(self, request), fields(professional_id = %request.professional_id))]
    pub async fn book_appointment(
        &self,
        user_id: Uuid,
        request: BookAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.locks.acquire(request.professional_id).await;

        let validated = match self.validator.validate(user_id, &request, now).await {
            Ok(validated) => validated,
            Err(e) => {
                warn!("Booking rejected for user {}: {}", user_id, e);
                return Err(e);
            }
        };

        let appointment = self.appointments.insert(validated, now).await?;

        info!(
            "Appointment {} booked for user {} from {} to {}",
            appointment.id, user_id, appointment.start_time, appointment.end_time
        );
        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Reads the record again under its professional's lock, so the guard
    /// always sees the status the update will replace.
    async fn locked_current(
        &self,
        appointment_id: Uuid,
    ) -> Result<(Appointment, OwnedMutexGuard<()>), AppointmentError> {
        let professional_id = self.get_appointment(appointment_id).await?.professional_id;
        let guard = self.locks.acquire(professional_id).await;
        let appointment = self.get_appointment(appointment_id).await?;
        Ok((appointment, guard))
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let (appointment, _guard) = self.locked_current(appointment_id).await?;
        self.lifecycle.can_cancel(&appointment, now)?;

        let cancelled = self
            .appointments
            .update_status(appointment_id, appointment.status, AppointmentStatus::Cancelled, now)
            .await?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    pub async fn complete_appointment(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let (appointment, _guard) = self.locked_current(appointment_id).await?;
        self.lifecycle.can_complete(&appointment, now)?;

        let completed = self
            .appointments
            .update_status(appointment_id, appointment.status, AppointmentStatus::Completed, now)
            .await?;

        info!("Appointment {} marked as completed", appointment_id);
        Ok(completed)
    }
}
