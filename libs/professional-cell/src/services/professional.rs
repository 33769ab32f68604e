use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::AppointmentStore;
use shared_models::appointment::AppointmentStatus;

use crate::models::{
    DayCalendarEntry, DaySchedule, Professional, ProfessionalDetail, ProfessionalError, WeeklySchedule,
};
use crate::services::slots::{booking_window, SlotGenerator};
use crate::store::ProfessionalStore;

pub struct ProfessionalService {
    professionals: Arc<dyn ProfessionalStore>,
    appointments: Arc<dyn AppointmentStore>,
    generator: SlotGenerator,
    lookahead_days: u32,
    max_lookahead_days: u32,
}

impl ProfessionalService {
    pub fn new(
        config: &AppConfig,
        professionals: Arc<dyn ProfessionalStore>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        Self {
            professionals,
            appointments,
            generator: SlotGenerator::new(),
            lookahead_days: config.slot_lookahead_days,
            max_lookahead_days: config.max_slot_lookahead_days.max(config.slot_lookahead_days),
        }
    }

    /// Professionals accepting bookings.
    pub async fn list_professionals(&self) -> Result<Vec<Professional>, ProfessionalError> {
        Ok(self.professionals.list_available().await?)
    }

    pub async fn get_professional(&self, id: Uuid) -> Result<Professional, ProfessionalError> {
        self.professionals
            .find_by_id(id)
            .await?
            .ok_or(ProfessionalError::NotFound)
    }

    /// Professional plus the default-lookahead calendar starting on `now`'s date.
    pub async fn get_professional_detail(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ProfessionalDetail, ProfessionalError> {
        let professional = self.get_professional(id).await?;

        let slots_available = if professional.available {
            self.booking_calendar(&professional, now.date_naive(), self.lookahead_days)
                .await?
        } else {
            debug!("Professional {} is globally unavailable, omitting calendar", id);
            Vec::new()
        };

        Ok(ProfessionalDetail {
            professional,
            slots_available,
        })
    }

    /// Calendar from `first_day` through `first_day + lookahead_days`, reading
    /// the professional's bookings for the whole window in one query.
    pub async fn booking_calendar(
        &self,
        professional: &Professional,
        first_day: NaiveDate,
        lookahead_days: u32,
    ) -> Result<Vec<DayCalendarEntry>, ProfessionalError> {
        let (window_start, window_end) = booking_window(&professional.schedule, first_day, lookahead_days);
        let bookings = self
            .appointments
            .find_in_range(professional.id, window_start, window_end, AppointmentStatus::Booked)
            .await?;

        Ok(self
            .generator
            .generate(&professional.schedule, first_day, lookahead_days, &bookings))
    }

    /// Calendar entry for one date, which must fall between today and the
    /// maximum lookahead.
    pub async fn get_slots_for_date(
        &self,
        id: Uuid,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DayCalendarEntry, ProfessionalError> {
        let today = now.date_naive();
        if date < today {
            return Err(ProfessionalError::DateInPast(date));
        }

        let offset = (date - today).num_days();
        if offset > i64::from(self.max_lookahead_days) {
            return Err(ProfessionalError::DateOutOfRange {
                date,
                max_days: self.max_lookahead_days,
            });
        }

        let professional = self.get_professional(id).await?;
        let (day_start, day_end) = booking_window(&professional.schedule, date, 0);
        let bookings = self
            .appointments
            .find_in_range(professional.id, day_start, day_end, AppointmentStatus::Booked)
            .await?;

        debug!(
            "Building slots for professional {} on {} against {} bookings",
            id,
            date,
            bookings.len()
        );
        Ok(self.generator.generate_day(&professional.schedule, date, &bookings))
    }

    /// Replace the weekly schedule after validating it.
    pub async fn update_schedule(
        &self,
        id: Uuid,
        days: Vec<DaySchedule>,
        now: DateTime<Utc>,
    ) -> Result<Professional, ProfessionalError> {
        let schedule = WeeklySchedule::new(days)?;
        let updated = self.professionals.update_schedule(id, schedule, now).await?;
        info!("Updated weekly schedule for professional {}", id);
        Ok(updated)
    }

    pub async fn set_availability(
        &self,
        id: Uuid,
        available: bool,
        now: DateTime<Utc>,
    ) -> Result<Professional, ProfessionalError> {
        let updated = self.professionals.set_available(id, available, now).await?;
        info!("Professional {} availability set to {}", id, available);
        Ok(updated)
    }
}
