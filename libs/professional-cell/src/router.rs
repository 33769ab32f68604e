use axum::{
    middleware,
    routing::{get, patch, put},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, ProfessionalState};

pub fn professional_routes(state: ProfessionalState) -> Router {
    Router::new()
        .route("/", get(handlers::list_professionals))
        .route("/{professional_id}", get(handlers::get_professional))
        .route("/{professional_id}/slots", get(handlers::get_slots_for_date))
        .route("/{professional_id}/schedule", put(handlers::update_schedule))
        .route("/{professional_id}/availability", patch(handlers::set_availability))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
