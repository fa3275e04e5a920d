use crate::analytics::dashboard::{build_dashboard, DashboardView};
use crate::state::SharedState;
use crate::web::{ApiError, FilterQuery};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(dashboard_view))
        .with_state(state)
}

async fn dashboard_view(
    State(state): State<SharedState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<DashboardView>, ApiError> {
    let filter = query.into_filter()?;
    let items = state.store.list_all().await.map_err(|e| {
        tracing::error!("Failed to fetch feedback for dashboard: {}", e);
        ApiError::Internal
    })?;
    let filtered = filter.apply(items);
    Ok(Json(build_dashboard(&filtered)))
}
