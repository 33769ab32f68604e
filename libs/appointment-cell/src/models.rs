use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use professional_cell::models::DayOfWeek;
use shared_database::StoreError;
use shared_models::appointment::Appointment;
use shared_models::error::AppError;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub professional_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub description: Option<String>,
}

/// Tunable booking and lifecycle limits.
#[derive(Debug, Clone)]
pub struct BookingRules {
    pub max_description_chars: usize,
    pub cancellation_notice_hours: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            max_description_chars: 500,
            cancellation_notice_hours: 24,
        }
    }
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

/// Appointment record plus the display fields clients render directly.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub appointment_date: NaiveDate,
    pub appointment_day: DayOfWeek,
    /// e.g. "07:00 pm - 08:00 pm"
    pub appointment_slot: String,
}

impl From<Appointment> for AppointmentView {
    fn from(appointment: Appointment) -> Self {
        let date = appointment.start_time.date_naive();
        let appointment_slot = format!(
            "{} - {}",
            appointment.start_time.format("%I:%M %P"),
            appointment.end_time.format("%I:%M %P")
        );

        Self {
            appointment_date: date,
            appointment_day: DayOfWeek::of(date),
            appointment_slot,
            appointment,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Why a booking request was refused. Variants follow the order the
/// validator checks them in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookingRejection {
    #[error("The selected healthcare professional does not exist.")]
    ProfessionalNotFound,

    #[error("The appointment start time must be in the future.")]
    StartNotInFuture,

    #[error("The appointment end time must be after the start time.")]
    EndNotAfterStart,

    #[error("The description may not be longer than {max} characters.")]
    DescriptionTooLong { max: usize },

    #[error("The selected healthcare professional is not available.")]
    ProfessionalUnavailable,

    #[error("The doctor is not available on {weekday}.")]
    DayUnavailable { weekday: DayOfWeek },

    #[error("The appointment must be at least {minimum_minutes} minutes long.")]
    TooShort { minimum_minutes: u32 },

    #[error("The appointment start time must align with the {interval_minutes}-minute slots.")]
    Misaligned { interval_minutes: u32 },

    #[error("Doctor works only between {work_start} and {work_end} on {weekday}.")]
    OutsideWorkingHours {
        weekday: DayOfWeek,
        work_start: NaiveTime,
        work_end: NaiveTime,
    },

    #[error("This time slot is already booked. Please choose another.")]
    SlotTaken,
}

/// Lifecycle guard failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyViolation {
    #[error("You cannot cancel the appointment within {hours} hours of the scheduled time.")]
    CancellationWindow { hours: i64 },

    #[error("This appointment is already cancelled.")]
    AlreadyCancelled,

    #[error("This appointment is already marked as completed.")]
    AlreadyCompleted,

    #[error("Cancelled appointments cannot be marked as completed.")]
    CancelledCannotComplete,

    #[error("You can only mark the appointment as completed after it has ended.")]
    NotYetEnded,

    #[error("This appointment was updated by another request. Please reload it.")]
    StatusChanged,
}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error(transparent)]
    Validation(#[from] BookingRejection),

    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error("Appointment not found")]
    NotFound,

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppointmentError::NotFound,
            StoreError::Overlap => AppointmentError::Validation(BookingRejection::SlotTaken),
            StoreError::StatusChanged => AppointmentError::Policy(PolicyViolation::StatusChanged),
            other => AppointmentError::Store(other),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation(rejection) => AppError::ValidationError(rejection.to_string()),
            AppointmentError::Policy(violation) => AppError::Policy(violation.to_string()),
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::Store(inner) => AppError::Database(inner.to_string()),
        }
    }
}
