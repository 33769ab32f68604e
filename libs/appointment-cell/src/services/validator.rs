use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use professional_cell::models::{DayOfWeek, Professional};
use professional_cell::store::ProfessionalStore;
use shared_database::AppointmentStore;
use shared_models::appointment::{AppointmentStatus, NewAppointment};

use crate::models::{AppointmentError, BookAppointmentRequest, BookingRejection, BookingRules};

/// Checks a booking request against the professional's schedule and the
/// appointments already on record. Never writes.
pub struct BookingValidator {
    professionals: Arc<dyn ProfessionalStore>,
    appointments: Arc<dyn AppointmentStore>,
    rules: BookingRules,
}

impl BookingValidator {
    pub fn new(
        professionals: Arc<dyn ProfessionalStore>,
        appointments: Arc<dyn AppointmentStore>,
        rules: BookingRules,
    ) -> Self {
        Self {
            professionals,
            appointments,
            rules,
        }
    }

    /// Runs every rule in order and returns the record to persist.
    pub async fn validate(
        &self,
        user_id: Uuid,
        request: &BookAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<NewAppointment, AppointmentError> {
        let professional = self.professionals.find_by_id(request.professional_id).await?;
        check_booking_rules(professional.as_ref(), request, &self.rules, now)?;

        let conflicts = self
            .appointments
            .find_overlapping(
                request.professional_id,
                request.start_time,
                request.end_time,
                AppointmentStatus::Booked,
            )
            .await?;

        if !conflicts.is_empty() {
            debug!(
                "Requested window {} - {} overlaps {} booking(s)",
                request.start_time,
                request.end_time,
                conflicts.len()
            );
            return Err(BookingRejection::SlotTaken.into());
        }

        Ok(NewAppointment {
            user_id,
            professional_id: request.professional_id,
            start_time: request.start_time,
            end_time: request.end_time,
            description: request.description.clone(),
        })
    }
}

/// Every rule that can be decided without looking at other appointments,
/// failing on the first one broken.
pub fn check_booking_rules(
    professional: Option<&Professional>,
    request: &BookAppointmentRequest,
    rules: &BookingRules,
    now: DateTime<Utc>,
) -> Result<(), BookingRejection> {
    let professional = professional.ok_or(BookingRejection::ProfessionalNotFound)?;

    if request.start_time <= now {
        return Err(BookingRejection::StartNotInFuture);
    }
    if request.end_time <= request.start_time {
        return Err(BookingRejection::EndNotAfterStart);
    }
    if let Some(description) = &request.description {
        if description.chars().count() > rules.max_description_chars {
            return Err(BookingRejection::DescriptionTooLong {
                max: rules.max_description_chars,
            });
        }
    }

    if !professional.available {
        return Err(BookingRejection::ProfessionalUnavailable);
    }

    let date = request.start_time.date_naive();
    let weekday = DayOfWeek::of(date);
    let day = professional
        .schedule
        .available_day(weekday)
        .ok_or(BookingRejection::DayUnavailable { weekday })?;

    let interval_minutes = day.effective_interval_minutes();
    if request.end_time - request.start_time < Duration::minutes(i64::from(interval_minutes)) {
        return Err(BookingRejection::TooShort {
            minimum_minutes: interval_minutes,
        });
    }

    let work_start = date.and_time(day.work_start).and_utc();
    let work_end = date.and_time(day.work_end).and_utc();

    let offset_seconds = (request.start_time - work_start).num_seconds().abs();
    if offset_seconds % (i64::from(interval_minutes) * 60) != 0 {
        return Err(BookingRejection::Misaligned { interval_minutes });
    }

    if request.start_time < work_start || request.end_time > work_end {
        return Err(BookingRejection::OutsideWorkingHours {
            weekday,
            work_start: day.work_start,
            work_end: day.work_end,
        });
    }

    Ok(())
}
