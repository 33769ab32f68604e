use chrono::{DateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::models::{DayOfWeek, DaySchedule, Professional, Speciality, WeeklySchedule};

const DEMO_NAMES: [&str; 6] = [
    "Dr. Amara Okafor",
    "Dr. Lena Fischer",
    "Dr. Tomas Alvarez",
    "Dr. Priya Raman",
    "Dr. Jonah Whitfield",
    "Dr. Mei Tanaka",
];

/// Default week: 10:00 to 22:00 in 30-minute slots, closed on Sunday.
pub fn default_week() -> WeeklySchedule {
    let (Some(work_start), Some(work_end)) = (
        NaiveTime::from_hms_opt(10, 0, 0),
        NaiveTime::from_hms_opt(22, 0, 0),
    ) else {
        return WeeklySchedule::default();
    };

    let days = DayOfWeek::ALL
        .into_iter()
        .map(|weekday| DaySchedule {
            weekday,
            available: weekday != DayOfWeek::Sun,
            work_start,
            work_end,
            slot_interval_minutes: 30,
        })
        .collect();

    WeeklySchedule::new(days).unwrap_or_default()
}

/// One professional per speciality, all on the default week.
pub fn demo_professionals(now: DateTime<Utc>) -> Vec<Professional> {
    Speciality::ALL
        .into_iter()
        .zip(DEMO_NAMES)
        .map(|(speciality, name)| Professional {
            id: Uuid::new_v4(),
            name: name.to_string(),
            about: Some(format!("{:?} with weekday and Saturday availability.", speciality)),
            available: true,
            speciality,
            schedule: default_week(),
            created_at: now,
            updated_at: now,
        })
        .collect()
}
