use std::collections::HashMap;
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use appointment_cell::models::{AppointmentError, BookAppointmentRequest, BookingRejection, PolicyViolation};
use appointment_cell::services::AppointmentBookingService;
use professional_cell::models::Professional;
use professional_cell::seed::demo_professionals;
use professional_cell::services::ProfessionalService;
use professional_cell::store::InMemoryProfessionalStore;
use shared_database::{AppointmentStore, InMemoryAppointmentStore, StoreError};
use shared_models::appointment::{ActiveStatus, Appointment, AppointmentStatus, NewAppointment};
use shared_utils::test_utils::TestConfig;

// Tuesday 2030-01-01; the following Monday is 2030-01-07.
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 8, 0, 0).unwrap()
}

fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 7, hour, minute, 0).unwrap()
}

fn request(professional: &Professional, start: DateTime<Utc>, end: DateTime<Utc>) -> BookAppointmentRequest {
    BookAppointmentRequest {
        professional_id: professional.id,
        start_time: start,
        end_time: end,
        description: Some("Annual check-up".to_string()),
    }
}

struct Fixture {
    professional: Professional,
    booking: Arc<AppointmentBookingService>,
    professionals: ProfessionalService,
}

fn fixture_with_store(appointments: Arc<dyn AppointmentStore>) -> Fixture {
    let config = TestConfig::default().to_app_config();
    let roster = demo_professionals(now());
    let professional = roster[0].clone();
    let store = Arc::new(InMemoryProfessionalStore::with_professionals(roster));

    Fixture {
        professional,
        booking: Arc::new(AppointmentBookingService::new(&config, store.clone(), appointments.clone())),
        professionals: ProfessionalService::new(&config, store, appointments),
    }
}

fn fixture() -> Fixture {
    fixture_with_store(Arc::new(InMemoryAppointmentStore::new()))
}

#[tokio::test]
async fn test_aligned_booking_succeeds() {
    let f = fixture();
    let user = Uuid::new_v4();

    let appointment = f
        .booking
        .book_appointment(user, request(&f.professional, monday_at(19, 0), monday_at(20, 0)), now())
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Booked);
    assert_eq!(appointment.active_status, ActiveStatus::Active);
    assert_eq!(appointment.user_id, user);
    assert_eq!(appointment.duration_minutes(), 60);
}

#[tokio::test]
async fn test_misaligned_booking_fails() {
    let f = fixture();

    let result = f
        .booking
        .book_appointment(
            Uuid::new_v4(),
            request(&f.professional, monday_at(19, 5), monday_at(20, 5)),
            now(),
        )
        .await;

    assert_matches!(
        result,
        Err(AppointmentError::Validation(BookingRejection::Misaligned { interval_minutes: 30 }))
    );
}

#[tokio::test]
async fn test_unknown_professional_is_a_validation_error() {
    let f = fixture();
    let mut req = request(&f.professional, monday_at(19, 0), monday_at(20, 0));
    req.professional_id = Uuid::new_v4();

    assert_matches!(
        f.booking.book_appointment(Uuid::new_v4(), req, now()).await,
        Err(AppointmentError::Validation(BookingRejection::ProfessionalNotFound))
    );
}

#[tokio::test]
async fn test_overlapping_booking_is_rejected_but_adjacent_is_not() {
    let f = fixture();
    f.booking
        .book_appointment(Uuid::new_v4(), request(&f.professional, monday_at(19, 0), monday_at(20, 0)), now())
        .await
        .unwrap();

    assert_matches!(
        f.booking
            .book_appointment(Uuid::new_v4(), request(&f.professional, monday_at(19, 30), monday_at(20, 30)), now())
            .await,
        Err(AppointmentError::Validation(BookingRejection::SlotTaken))
    );

    assert!(f
        .booking
        .book_appointment(Uuid::new_v4(), request(&f.professional, monday_at(20, 0), monday_at(21, 0)), now())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_booked_window_shows_as_unavailable_slot() {
    let f = fixture();
    f.booking
        .book_appointment(Uuid::new_v4(), request(&f.professional, monday_at(19, 0), monday_at(20, 0)), now())
        .await
        .unwrap();

    let entry = f
        .professionals
        .get_slots_for_date(f.professional.id, NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(), now())
        .await
        .unwrap();

    let taken: Vec<&str> = entry
        .slots
        .iter()
        .filter(|slot| !slot.available)
        .map(|slot| slot.time.as_str())
        .collect();
    assert_eq!(taken, vec!["07:00 pm", "07:30 pm"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_identical_bookings_yield_one_success() {
    let f = fixture();
    let first = request(&f.professional, monday_at(19, 0), monday_at(20, 0));
    let second = first.clone();

    let (a, b) = tokio::join!(
        f.booking.book_appointment(Uuid::new_v4(), first, now()),
        f.booking.book_appointment(Uuid::new_v4(), second, now()),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(AppointmentError::Validation(BookingRejection::SlotTaken))
    )));
}

/// Store without its own overlap guard; a slow conflict query widens the race.
#[derive(Default)]
struct UnguardedStore {
    rows: RwLock<HashMap<Uuid, Appointment>>,
}

#[async_trait]
impl AppointmentStore for UnguardedStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_overlapping(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StoreError> {
        let found: Vec<Appointment> = self
            .rows
            .read()
            .await
            .values()
            .filter(|a| a.professional_id == professional_id && a.status == status && a.overlaps(start, end))
            .cloned()
            .collect();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        Ok(found)
    }

    async fn find_in_range(
        &self,
        _professional_id: Uuid,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(Vec::new())
    }

    async fn list_for_user(&self, _user_id: Uuid, _active: ActiveStatus) -> Result<Vec<Appointment>, StoreError> {
        Ok(Vec::new())
    }

    async fn insert(&self, appointment: NewAppointment, now: DateTime<Utc>) -> Result<Appointment, StoreError> {
        let record = appointment.into_appointment(now);
        self.rows.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_status(
        &self,
        _id: Uuid,
        _from: AppointmentStatus,
        _to: AppointmentStatus,
        _now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        Err(StoreError::NotFound)
    }
}

/// In-memory store whose reads are slow enough for two transitions to
/// interleave between reading a record and writing its new status.
#[derive(Default)]
struct SlowReads {
    inner: InMemoryAppointmentStore,
}

#[async_trait]
impl AppointmentStore for SlowReads {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let found = self.inner.find_by_id(id).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        found
    }

    async fn find_overlapping(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.find_overlapping(professional_id, start, end, status).await
    }

    async fn find_in_range(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.find_in_range(professional_id, start, end, status).await
    }

    async fn list_for_user(&self, user_id: Uuid, active: ActiveStatus) -> Result<Vec<Appointment>, StoreError> {
        self.inner.list_for_user(user_id, active).await
    }

    async fn insert(&self, appointment: NewAppointment, now: DateTime<Utc>) -> Result<Appointment, StoreError> {
        self.inner.insert(appointment, now).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        self.inner.update_status(id, from, to, now).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_booking_lock_serializes_check_and_insert() {
    let store = Arc::new(UnguardedStore::default());
    let f = fixture_with_store(store.clone());

    let attempts: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&f.booking);
            let req = request(&f.professional, monday_at(19, 0), monday_at(20, 0));
            tokio::spawn(async move { service.book_appointment(Uuid::new_v4(), req, now()).await })
        })
        .collect();

    let results = futures::future::join_all(attempts).await;
    let successes = results
        .into_iter()
        .filter(|joined| matches!(joined, Ok(Ok(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(store.rows.read().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_cancel_and_complete_apply_one_transition() {
    let store = Arc::new(SlowReads::default());
    let f = fixture_with_store(store.clone());
    let booked = f
        .booking
        .book_appointment(Uuid::new_v4(), request(&f.professional, monday_at(19, 0), monday_at(20, 0)), now())
        .await
        .unwrap();

    let (cancelled, completed) = tokio::join!(
        f.booking.cancel_appointment(booked.id, monday_at(19, 0) - Duration::hours(48)),
        f.booking.complete_appointment(booked.id, monday_at(21, 0)),
    );

    assert_eq!(
        [cancelled.is_ok(), completed.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );

    let stored = store.inner.find_by_id(booked.id).await.unwrap().unwrap();
    match (cancelled, completed) {
        (Ok(_), Err(loser)) => {
            assert_eq!(stored.status, AppointmentStatus::Cancelled);
            assert_matches!(loser, AppointmentError::Policy(PolicyViolation::CancelledCannotComplete));
        }
        (Err(loser), Ok(_)) => {
            assert_eq!(stored.status, AppointmentStatus::Completed);
            assert_matches!(loser, AppointmentError::Policy(PolicyViolation::AlreadyCompleted));
        }
        outcome => panic!("expected exactly one transition, got {:?}", outcome),
    }
}

#[tokio::test]
async fn test_listing_skips_archived_and_inactive_records() {
    let user = Uuid::new_v4();
    let roster = demo_professionals(now());
    let records: Vec<Appointment> = [
        (12, ActiveStatus::Active),
        (14, ActiveStatus::Archived),
        (16, ActiveStatus::Inactive),
    ]
    .into_iter()
    .map(|(hour, active_status)| {
        let mut record = NewAppointment {
            user_id: user,
            professional_id: roster[0].id,
            start_time: monday_at(hour, 0),
            end_time: monday_at(hour + 1, 0),
            description: None,
        }
        .into_appointment(now());
        record.active_status = active_status;
        record
    })
    .collect();

    let f = fixture_with_store(Arc::new(InMemoryAppointmentStore::with_appointments(records)));
    let mine = f.booking.list_appointments(user).await.unwrap();

    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].start_time, monday_at(12, 0));
    assert_eq!(mine[0].active_status, ActiveStatus::Active);
}

#[tokio::test]
async fn test_cancel_respects_notice_period() {
    let f = fixture();
    let booked = f
        .booking
        .book_appointment(Uuid::new_v4(), request(&f.professional, monday_at(19, 0), monday_at(20, 0)), now())
        .await
        .unwrap();

    let exactly_24h = monday_at(19, 0) - Duration::hours(24);
    assert_matches!(
        f.booking.cancel_appointment(booked.id, exactly_24h).await,
        Err(AppointmentError::Policy(PolicyViolation::CancellationWindow { hours: 24 }))
    );

    let cancelled = f
        .booking
        .cancel_appointment(booked.id, exactly_24h - Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    assert_matches!(
        f.booking.cancel_appointment(booked.id, now()).await,
        Err(AppointmentError::Policy(PolicyViolation::AlreadyCancelled))
    );
    assert_matches!(
        f.booking.complete_appointment(booked.id, monday_at(21, 0)).await,
        Err(AppointmentError::Policy(PolicyViolation::CancelledCannotComplete))
    );

    // The freed window can be booked again.
    assert!(f
        .booking
        .book_appointment(Uuid::new_v4(), request(&f.professional, monday_at(19, 0), monday_at(20, 0)), now())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_complete_after_end_only_once() {
    let f = fixture();
    let booked = f
        .booking
        .book_appointment(Uuid::new_v4(), request(&f.professional, monday_at(19, 0), monday_at(20, 0)), now())
        .await
        .unwrap();

    assert_matches!(
        f.booking.complete_appointment(booked.id, monday_at(19, 59)).await,
        Err(AppointmentError::Policy(PolicyViolation::NotYetEnded))
    );

    let completed = f.booking.complete_appointment(booked.id, monday_at(20, 0)).await.unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);

    assert_matches!(
        f.booking.complete_appointment(booked.id, monday_at(21, 0)).await,
        Err(AppointmentError::Policy(PolicyViolation::AlreadyCompleted))
    );
}

#[tokio::test]
async fn test_missing_appointment() {
    let f = fixture();
    assert_matches!(
        f.booking.get_appointment(Uuid::new_v4()).await,
        Err(AppointmentError::NotFound)
    );
    assert_matches!(
        f.booking.cancel_appointment(Uuid::new_v4(), now()).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn test_listing_is_per_user_newest_first() {
    let f = fixture();
    let user = Uuid::new_v4();

    for hour in [12, 19, 15] {
        f.booking
            .book_appointment(user, request(&f.professional, monday_at(hour, 0), monday_at(hour + 1, 0)), now())
            .await
            .unwrap();
    }
    f.booking
        .book_appointment(Uuid::new_v4(), request(&f.professional, monday_at(10, 0), monday_at(11, 0)), now())
        .await
        .unwrap();

    let mine = f.booking.list_appointments(user).await.unwrap();
    let starts: Vec<DateTime<Utc>> = mine.iter().map(|a| a.start_time).collect();
    assert_eq!(starts, vec![monday_at(19, 0), monday_at(15, 0), monday_at(12, 0)]);
}
