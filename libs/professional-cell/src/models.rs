use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use std::fmt;
use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;

/// Slot lengths below this are rounded up when generating or validating bookings.
pub const MIN_SLOT_INTERVAL_MINUTES: u32 = 30;

// ==============================================================================
// WEEKLY AVAILABILITY SCHEDULE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sun,
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
    ];

    /// 0 = Sunday, 1 = Monday, etc.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => DayOfWeek::Sun,
            Weekday::Mon => DayOfWeek::Mon,
            Weekday::Tue => DayOfWeek::Tue,
            Weekday::Wed => DayOfWeek::Wed,
            Weekday::Thu => DayOfWeek::Thu,
            Weekday::Fri => DayOfWeek::Fri,
            Weekday::Sat => DayOfWeek::Sat,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Sun => "SUN",
            DayOfWeek::Mon => "MON",
            DayOfWeek::Tue => "TUE",
            DayOfWeek::Wed => "WED",
            DayOfWeek::Thu => "THU",
            DayOfWeek::Fri => "FRI",
            DayOfWeek::Sat => "SAT",
        };
        write!(f, "{}", name)
    }
}

/// Working hours for one weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    #[serde(rename = "day")]
    pub weekday: DayOfWeek,
    pub available: bool,
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub slot_interval_minutes: u32,
}

impl DaySchedule {
    pub fn effective_interval_minutes(&self) -> u32 {
        self.slot_interval_minutes.max(MIN_SLOT_INTERVAL_MINUTES)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.work_start >= self.work_end {
            return Err(ScheduleError::InvalidHours {
                weekday: self.weekday,
                work_start: self.work_start,
                work_end: self.work_end,
            });
        }
        if self.slot_interval_minutes == 0 {
            return Err(ScheduleError::InvalidInterval { weekday: self.weekday });
        }
        Ok(())
    }
}

/// At most one entry per weekday. Serialized as the list of configured days.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<DaySchedule>", into = "Vec<DaySchedule>")]
pub struct WeeklySchedule {
    days: [Option<DaySchedule>; 7],
}

impl WeeklySchedule {
    pub fn new(entries: Vec<DaySchedule>) -> Result<Self, ScheduleError> {
        let mut schedule = Self::default();
        for entry in entries {
            entry.validate()?;
            let slot = &mut schedule.days[entry.weekday.index()];
            if slot.is_some() {
                return Err(ScheduleError::DuplicateDay(entry.weekday));
            }
            *slot = Some(entry);
        }
        Ok(schedule)
    }

    pub fn day(&self, weekday: DayOfWeek) -> Option<&DaySchedule> {
        self.days[weekday.index()].as_ref()
    }

    /// The entry for `weekday` only if the professional takes bookings that day.
    pub fn available_day(&self, weekday: DayOfWeek) -> Option<&DaySchedule> {
        self.day(weekday).filter(|entry| entry.available)
    }

    pub fn entries(&self) -> impl Iterator<Item = &DaySchedule> {
        self.days.iter().flatten()
    }
}

impl TryFrom<Vec<DaySchedule>> for WeeklySchedule {
    type Error = ScheduleError;

    fn try_from(entries: Vec<DaySchedule>) -> Result<Self, Self::Error> {
        WeeklySchedule::new(entries)
    }
}

impl From<WeeklySchedule> for Vec<DaySchedule> {
    fn from(schedule: WeeklySchedule) -> Self {
        schedule.days.into_iter().flatten().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("{0} is configured more than once")]
    DuplicateDay(DayOfWeek),

    #[error("Work start {work_start} must be before work end {work_end} on {weekday}")]
    InvalidHours {
        weekday: DayOfWeek,
        work_start: NaiveTime,
        work_end: NaiveTime,
    },

    #[error("Slot interval on {weekday} must be a positive number of minutes")]
    InvalidInterval { weekday: DayOfWeek },
}

// ==============================================================================
// PROFESSIONALS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speciality {
    GeneralPhysician,
    Gynecologist,
    Dermatologist,
    Pediatricians,
    Neurologist,
    Gastroenterologist,
}

impl Speciality {
    pub const ALL: [Speciality; 6] = [
        Speciality::GeneralPhysician,
        Speciality::Gynecologist,
        Speciality::Dermatologist,
        Speciality::Pediatricians,
        Speciality::Neurologist,
        Speciality::Gastroenterologist,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
    pub id: Uuid,
    pub name: String,
    pub about: Option<String>,
    /// Global switch, independent of the per-day schedule.
    pub available: bool,
    pub speciality: Speciality,
    #[serde(rename = "available_days", default)]
    pub schedule: WeeklySchedule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfessionalDetail {
    #[serde(flatten)]
    pub professional: Professional,
    pub slots_available: Vec<DayCalendarEntry>,
}

// ==============================================================================
// DERIVED CALENDAR
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    /// Display label, e.g. "07:00 pm".
    pub time: String,
    pub starts_at: DateTime<Utc>,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCalendarEntry {
    pub day: DayOfWeek,
    /// Two-digit day of month.
    pub date: String,
    pub full_date: NaiveDate,
    pub available: bool,
    pub slots: Vec<Slot>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateScheduleRequest {
    pub available_days: Vec<DaySchedule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAvailabilityRequest {
    pub available: bool,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum ProfessionalError {
    #[error("Healthcare professional not found")]
    NotFound,

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(#[from] ScheduleError),

    #[error("The date {0} must be today or a future date")]
    DateInPast(NaiveDate),

    #[error("The date {date} is more than {max_days} days ahead")]
    DateOutOfRange { date: NaiveDate, max_days: u32 },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ProfessionalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ProfessionalError::NotFound,
            other => ProfessionalError::Store(other),
        }
    }
}

impl From<ProfessionalError> for AppError {
    fn from(err: ProfessionalError) -> Self {
        let message = err.to_string();
        match err {
            ProfessionalError::NotFound => AppError::NotFound(message),
            ProfessionalError::InvalidSchedule(_)
            | ProfessionalError::DateInPast(_)
            | ProfessionalError::DateOutOfRange { .. } => AppError::ValidationError(message),
            ProfessionalError::Store(_) => AppError::Database(message),
        }
    }
}
