use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::appointment_routes;
use appointment_cell::services::AppointmentBookingService;
use professional_cell::seed::demo_professionals;
use professional_cell::store::InMemoryProfessionalStore;
use shared_database::InMemoryAppointmentStore;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    router: Router,
    professional_id: Uuid,
}

fn create_test_app() -> TestApp {
    let config = TestConfig::default().to_arc();
    let roster = demo_professionals(Utc::now());
    let professional_id = roster[0].id;

    let service = AppointmentBookingService::new(
        &config,
        Arc::new(InMemoryProfessionalStore::with_professionals(roster)),
        Arc::new(InMemoryAppointmentStore::new()),
    );

    TestApp {
        router: appointment_routes(AppointmentState {
            config,
            service: Arc::new(service),
        }),
        professional_id,
    }
}

/// 19:00 UTC at least three days out, skipping the seeded Sunday closure.
fn evening_slot() -> (DateTime<Utc>, DateTime<Utc>) {
    let mut date = Utc::now().date_naive() + Duration::days(3);
    if date.weekday() == Weekday::Sun {
        date += Duration::days(1);
    }
    let start = date.and_time(NaiveTime::from_hms_opt(19, 0, 0).unwrap()).and_utc();
    (start, start + Duration::hours(1))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn authed(method: &str, uri: &str, user: &TestUser, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", JwtTestUtils::bearer_for(user));

    match body {
        Some(payload) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn book(app: &TestApp, user: &TestUser, start: DateTime<Utc>, end: DateTime<Utc>) -> (StatusCode, Value) {
    let payload = json!({
        "professional_id": app.professional_id,
        "start_time": start,
        "end_time": end,
        "description": "Persistent headache"
    });
    send(&app.router, authed("POST", "/", user, Some(payload))).await
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = create_test_app();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_book_and_list() {
    let app = create_test_app();
    let patient = TestUser::patient("patient@example.com");
    let (start, end) = evening_slot();

    let (status, body) = book(&app, &patient, start, end).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "booked");
    assert_eq!(body["data"]["appointment_slot"], "07:00 pm - 08:00 pm");
    assert_eq!(body["data"]["user_id"], patient.id);

    let (status, listed) = send(&app.router, authed("GET", "/", &patient, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);

    let (_, other) = send(&app.router, authed("GET", "/", &TestUser::default(), None)).await;
    assert_eq!(other["total"], 0);
}

#[tokio::test]
async fn test_rejected_bookings_report_the_rule() {
    let app = create_test_app();
    let patient = TestUser::patient("patient@example.com");
    let (start, end) = evening_slot();

    let (status, body) = book(&app, &patient, start + Duration::minutes(5), end).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap_or_default().contains("align"));

    let (status, _) = book(&app, &patient, start, end).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = book(&app, &TestUser::default(), start, end).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap_or_default().contains("already booked"));
}

#[tokio::test]
async fn test_only_owner_or_admin_can_read() {
    let app = create_test_app();
    let owner = TestUser::patient("owner@example.com");
    let (start, end) = evening_slot();
    let (_, booked) = book(&app, &owner, start, end).await;
    let uri = format!("/{}", booked["data"]["id"].as_str().unwrap());

    let (status, _) = send(&app.router, authed("GET", &uri, &owner, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, authed("GET", &uri, &TestUser::patient("other@example.com"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app.router, authed("GET", &uri, &TestUser::admin("admin@example.com"), None)).await;
    assert_eq!(status, StatusCode::OK);

    let missing = format!("/{}", Uuid::new_v4());
    let (status, _) = send(&app.router, authed("GET", &missing, &owner, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_and_complete_transitions() {
    let app = create_test_app();
    let owner = TestUser::patient("owner@example.com");
    let (start, end) = evening_slot();
    let (_, booked) = book(&app, &owner, start, end).await;
    let id = booked["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app.router, authed("POST", &format!("/{}/complete", id), &owner, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap_or_default().contains("after it has ended"));

    let (status, body) = send(&app.router, authed("POST", &format!("/{}/cancel", id), &owner, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, _) = send(&app.router, authed("POST", &format!("/{}/cancel", id), &owner, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
