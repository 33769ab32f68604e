use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::debug;

use shared_models::appointment::{windows_overlap, Appointment};

use crate::models::{DayCalendarEntry, DayOfWeek, DaySchedule, Slot, WeeklySchedule};

/// Display format for slot labels, e.g. "07:00 pm".
pub const SLOT_LABEL_FORMAT: &str = "%I:%M %P";

/// Half-open instant range of booking starts that can touch a slot in the
/// window: midnight of `first_day` up to midnight after the last day, plus
/// the longest slot interval for a late slot running into the next day.
pub fn booking_window(
    schedule: &WeeklySchedule,
    first_day: NaiveDate,
    lookahead_days: u32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let overhang = schedule
        .entries()
        .filter(|day| day.available)
        .map(DaySchedule::effective_interval_minutes)
        .max()
        .unwrap_or(0);

    let start = first_day.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(i64::from(lookahead_days) + 1) + Duration::minutes(i64::from(overhang));
    (start, end)
}

/// Base slot start times keyed by `(work_start, work_end, interval)`.
/// Lives for one generation call only.
#[derive(Default)]
pub struct BaseSlotCache {
    entries: HashMap<(NaiveTime, NaiveTime, u32), Rc<[NaiveTime]>>,
}

impl BaseSlotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn base_slots(&mut self, day: &DaySchedule) -> Rc<[NaiveTime]> {
        let interval = day.effective_interval_minutes();
        let key = (day.work_start, day.work_end, interval);

        self.entries
            .entry(key)
            .or_insert_with(|| base_slot_times(day.work_start, day.work_end, interval).into())
            .clone()
    }
}

/// Start times from `work_start` stepping by `interval_minutes`, inclusive of `work_end`.
pub fn base_slot_times(work_start: NaiveTime, work_end: NaiveTime, interval_minutes: u32) -> Vec<NaiveTime> {
    let step = Duration::minutes(i64::from(interval_minutes.max(1)));
    let mut times = Vec::new();
    let mut current = work_start;

    while current <= work_end {
        times.push(current);
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        current = next;
    }

    times
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SlotGenerator;

impl SlotGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Calendar for `first_day` through `first_day + lookahead_days`, one entry per day.
    ///
    /// `bookings` are the professional's booked appointments for the window; each
    /// slot is unavailable iff its `[start, start + interval)` overlaps one of them.
    pub fn generate(
        &self,
        schedule: &WeeklySchedule,
        first_day: NaiveDate,
        lookahead_days: u32,
        bookings: &[Appointment],
    ) -> Vec<DayCalendarEntry> {
        let mut cache = BaseSlotCache::new();
        let entries: Vec<DayCalendarEntry> = (0..=lookahead_days)
            .filter_map(|offset| first_day.checked_add_days(chrono::Days::new(u64::from(offset))))
            .map(|date| self.day_entry(schedule, date, bookings, &mut cache))
            .collect();

        debug!(
            "Generated {} calendar days from {} with {} distinct base slot lists",
            entries.len(),
            first_day,
            cache.len()
        );
        entries
    }

    /// Calendar entry for a single date.
    pub fn generate_day(
        &self,
        schedule: &WeeklySchedule,
        date: NaiveDate,
        bookings: &[Appointment],
    ) -> DayCalendarEntry {
        let mut cache = BaseSlotCache::new();
        self.day_entry(schedule, date, bookings, &mut cache)
    }

    fn day_entry(
        &self,
        schedule: &WeeklySchedule,
        date: NaiveDate,
        bookings: &[Appointment],
        cache: &mut BaseSlotCache,
    ) -> DayCalendarEntry {
        let weekday = DayOfWeek::of(date);

        let Some(day) = schedule.available_day(weekday) else {
            return DayCalendarEntry {
                day: weekday,
                date: date.format("%d").to_string(),
                full_date: date,
                available: false,
                slots: Vec::new(),
            };
        };

        let interval = Duration::minutes(i64::from(day.effective_interval_minutes()));
        let slots = cache
            .base_slots(day)
            .iter()
            .map(|time| {
                let slot_start = date.and_time(*time).and_utc();
                let slot_end = slot_start + interval;
                let taken = bookings.iter().any(|appointment| {
                    appointment.is_booked()
                        && windows_overlap(slot_start, slot_end, appointment.start_time, appointment.end_time)
                });

                Slot {
                    time: time.format(SLOT_LABEL_FORMAT).to_string(),
                    starts_at: slot_start,
                    available: !taken,
                }
            })
            .collect();

        DayCalendarEntry {
            day: weekday,
            date: date.format("%d").to_string(),
            full_date: date,
            available: true,
            slots,
        }
    }
}
