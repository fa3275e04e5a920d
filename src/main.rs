mod analytics;
mod config;
mod db;
mod domain;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::db::{FeedbackStore, MemoryFeedbackStore, PgFeedbackStore, TimeoutStore};
use crate::state::{AppState, SharedState};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn FeedbackStore> = match config.database_url.as_deref() {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let store = PgFeedbackStore::connect(&config.database, url)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to database: {}", e);
                    e
                })?;
            tracing::info!("Database connection established");

            tracing::info!("Running database migrations...");
            store.migrate().await.map_err(|e| {
                tracing::error!("Failed to run database migrations: {}", e);
                e
            })?;
            tracing::info!("Database migrations completed");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, feedback is kept in memory and lost on restart");
            Arc::new(MemoryFeedbackStore::new())
        }
    };

    let store: Arc<dyn FeedbackStore> =
        Arc::new(TimeoutStore::new(store, config.database.statement_timeout));

    let backend = services::ai::backend_from_settings(&config.ai);
    tracing::info!(
        "AI model: {} (timeout {:?})",
        config.ai.model,
        config.ai.timeout
    );

    let shared: SharedState = Arc::new(AppState::new(store, backend));

    let app = web::routes(shared)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
