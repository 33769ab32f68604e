use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::{AppointmentBookingService, AppointmentState};
use professional_cell::seed::demo_professionals;
use professional_cell::{
    InMemoryProfessionalStore, ProfessionalService, ProfessionalState, ProfessionalStore,
    SupabaseProfessionalStore,
};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_database::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};

fn build_stores(config: &AppConfig) -> (Arc<dyn ProfessionalStore>, Arc<dyn AppointmentStore>) {
    if config.is_configured() {
        info!("Using Supabase at {}", config.supabase_url);
        let supabase = Arc::new(SupabaseClient::new(config));
        (
            Arc::new(SupabaseProfessionalStore::new(Arc::clone(&supabase))),
            Arc::new(SupabaseAppointmentStore::new(supabase)),
        )
    } else {
        let roster = demo_professionals(Utc::now());
        info!("Using in-memory stores seeded with {} professionals", roster.len());
        (
            Arc::new(InMemoryProfessionalStore::with_professionals(roster)),
            Arc::new(InMemoryAppointmentStore::new()),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic booking API server");

    let config = Arc::new(AppConfig::from_env());
    let (professionals, appointments) = build_stores(&config);

    let professional_state = ProfessionalState {
        config: Arc::clone(&config),
        service: Arc::new(ProfessionalService::new(
            &config,
            Arc::clone(&professionals),
            Arc::clone(&appointments),
        )),
    };
    let appointment_state = AppointmentState {
        config: Arc::clone(&config),
        service: Arc::new(AppointmentBookingService::new(&config, professionals, appointments)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(professional_state, appointment_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
