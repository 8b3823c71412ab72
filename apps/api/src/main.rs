use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use shared_config::AppConfig;
use shared_database::seed::seed_sample_data;
use shared_database::{InMemoryStore, SchedulingStore, SupabaseStore};
use shared_utils::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MedSchedule API server");

    let config = AppConfig::from_env();
    let store = build_store(&config).await?;

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, store);

    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    info!("Listening on {}", bind_address);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn SchedulingStore>> {
    if config.is_supabase_configured() {
        info!("Using Supabase store at {}", config.supabase_url);
        return Ok(Arc::new(SupabaseStore::from_config(config)));
    }

    let store = InMemoryStore::new();
    if config.seed_sample_data {
        let summary = seed_sample_data(&store).await.context("failed to seed sample data")?;
        info!("Seeded {} specialties and {} doctors", summary.specialties, summary.doctors);
    }
    Ok(Arc::new(store))
}
