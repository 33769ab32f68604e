use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{SetAvailabilityRequest, SlotsQuery, UpdateScheduleRequest};
use crate::services::ProfessionalService;

#[derive(Clone)]
pub struct ProfessionalState {
    pub config: Arc<AppConfig>,
    pub service: Arc<ProfessionalService>,
}

fn require_admin(user: &User, action: &str) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Only administrators can {}", action)))
    }
}

#[axum::debug_handler]
pub async fn list_professionals(
    State(state): State<ProfessionalState>,
) -> Result<Json<Value>, AppError> {
    let professionals = state.service.list_professionals().await?;

    Ok(Json(json!({
        "success": true,
        "message": "Healthcare professionals fetched successfully.",
        "total": professionals.len(),
        "data": professionals
    })))
}

#[axum::debug_handler]
pub async fn get_professional(
    State(state): State<ProfessionalState>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let detail = state
        .service
        .get_professional_detail(professional_id, Utc::now())
        .await?;

    let message = if detail.professional.available {
        "Healthcare professional fetched successfully."
    } else {
        "This healthcare professional is currently unavailable."
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "data": detail
    })))
}

#[axum::debug_handler]
pub async fn get_slots_for_date(
    State(state): State<ProfessionalState>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let entry = state
        .service
        .get_slots_for_date(professional_id, query.date, Utc::now())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Available slots fetched successfully.",
        "professional_id": professional_id,
        "full_date": entry.full_date,
        "data": entry
    })))
}

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<ProfessionalState>,
    Extension(user): Extension<User>,
    Path(professional_id): Path<Uuid>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user, "change professional schedules")?;

    let professional = state
        .service
        .update_schedule(professional_id, request.available_days, Utc::now())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Schedule updated successfully.",
        "data": professional
    })))
}

#[axum::debug_handler]
pub async fn set_availability(
    State(state): State<ProfessionalState>,
    Extension(user): Extension<User>,
    Path(professional_id): Path<Uuid>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user, "change professional availability")?;

    let professional = state
        .service
        .set_availability(professional_id, request.available, Utc::now())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability updated successfully.",
        "data": professional
    })))
}
