use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use shared_models::appointment::{Appointment, AppointmentStatus};

use crate::models::PolicyViolation;

/// Time-guarded transitions `booked -> cancelled` and `booked -> completed`.
pub struct AppointmentLifecycleService {
    cancellation_notice: Duration,
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new(24)
    }
}

impl AppointmentLifecycleService {
    pub fn new(cancellation_notice_hours: i64) -> Self {
        Self {
            cancellation_notice: Duration::hours(cancellation_notice_hours),
        }
    }

    /// Cancellation needs strictly more than the notice period left before start.
    pub fn can_cancel(&self, appointment: &Appointment, now: DateTime<Utc>) -> Result<(), PolicyViolation> {
        debug!("Checking cancellation of appointment {} at {}", appointment.id, now);

        match appointment.status {
            AppointmentStatus::Cancelled => return Err(PolicyViolation::AlreadyCancelled),
            AppointmentStatus::Completed => return Err(PolicyViolation::AlreadyCompleted),
            AppointmentStatus::Booked => {}
        }

        if appointment.start_time - now <= self.cancellation_notice {
            warn!(
                "Cancellation of appointment {} refused: starts at {}",
                appointment.id, appointment.start_time
            );
            return Err(PolicyViolation::CancellationWindow {
                hours: self.cancellation_notice.num_hours(),
            });
        }

        Ok(())
    }

    /// Completion is allowed once the appointment has ended.
    pub fn can_complete(&self, appointment: &Appointment, now: DateTime<Utc>) -> Result<(), PolicyViolation> {
        match appointment.status {
            AppointmentStatus::Cancelled => return Err(PolicyViolation::CancelledCannotComplete),
            AppointmentStatus::Completed => return Err(PolicyViolation::AlreadyCompleted),
            AppointmentStatus::Booked => {}
        }

        if now < appointment.end_time {
            return Err(PolicyViolation::NotYetEnded);
        }

        Ok(())
    }
}
