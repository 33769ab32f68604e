use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::appointment::Appointment;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AppointmentView, BookAppointmentRequest};
use crate::services::AppointmentBookingService;

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub service: Arc<AppointmentBookingService>,
}

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    user.user_id()
        .ok_or_else(|| AppError::Auth("Token subject is not a valid user id".to_string()))
}

/// Owners and admins only.
fn authorize(user: &User, appointment: &Appointment) -> Result<(), AppError> {
    if user.is_admin() || user.user_id() == Some(appointment.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to access this appointment".to_string()))
    }
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;
    let appointments: Vec<AppointmentView> = state
        .service
        .list_appointments(user_id)
        .await?
        .into_iter()
        .map(AppointmentView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "message": "Appointments fetched successfully.",
        "total": appointments.len(),
        "data": appointments
    })))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;
    let appointment = state
        .service
        .book_appointment(user_id, request, Utc::now())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment booked successfully.",
        "data": AppointmentView::from(appointment)
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.service.get_appointment(appointment_id).await?;
    authorize(&user, &appointment)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment fetched successfully.",
        "data": AppointmentView::from(appointment)
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.service.get_appointment(appointment_id).await?;
    authorize(&user, &appointment)?;

    let cancelled = state
        .service
        .cancel_appointment(appointment_id, Utc::now())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully.",
        "data": AppointmentView::from(cancelled)
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.service.get_appointment(appointment_id).await?;
    authorize(&user, &appointment)?;

    let completed = state
        .service
        .complete_appointment(appointment_id, Utc::now())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment marked as completed successfully.",
        "data": AppointmentView::from(completed)
    })))
}
