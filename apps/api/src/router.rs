use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use appointment_cell::AppointmentState;
use professional_cell::router::professional_routes;
use professional_cell::ProfessionalState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(professionals: ProfessionalState, appointments: AppointmentState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .route("/health", get(health))
        .nest("/professionals", professional_routes(professionals))
        .nest("/appointments", appointment_routes(appointments))
}
