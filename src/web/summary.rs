use crate::services::summary::{summarize_metrics, AggregateMetrics, ExecutiveSummary};
use crate::state::SharedState;
use crate::web::ApiError;
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/executive", get(get_executive_summary))
        .with_state(state)
}

async fn get_metrics(State(state): State<SharedState>) -> Result<Json<AggregateMetrics>, ApiError> {
    let items = state.store.list_all().await.map_err(|e| {
        tracing::error!("Failed to fetch feedback for metrics: {}", e);
        ApiError::Internal
    })?;
    Ok(Json(summarize_metrics(&items, Utc::now())))
}

/// Returns 200 with metrics even when the narrative could not be generated.
async fn get_executive_summary(
    State(state): State<SharedState>,
) -> Result<Json<ExecutiveSummary>, ApiError> {
    let items = state.store.list_all().await.map_err(|e| {
        tracing::error!("Failed to fetch feedback for executive summary: {}", e);
        ApiError::Internal
    })?;

    let summary = state
        .summaries
        .generate_executive_summary(&items, Utc::now())
        .await;

    match summary.error() {
        Some(err) => tracing::debug!("Executive summary served without narrative: {}", err),
        None => tracing::info!("Executive summary generated over {} items", items.len()),
    }
    Ok(Json(summary))
}
