use crate::db::UpvoteOutcome;
use crate::domain::models::{FeedbackItem, FeedbackSubmission};
use crate::services::assessment::AssessmentResult;
use crate::state::SharedState;
use crate::web::{ApiError, FilterQuery};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
pub struct SubmitResponse {
    pub item: FeedbackItem,
    pub assessment: AssessmentResult,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(submit_feedback))
        .route("/", get(list_feedback))
        .route("/:id/upvote", post(upvote_feedback))
        .with_state(state)
}

async fn submit_feedback(
    State(state): State<SharedState>,
    payload: Result<Json<FeedbackSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!("Unreadable feedback submission: {}", rejection);
        ApiError::BadRequest(rejection.body_text())
    })?;
    let feedback = payload.validate().map_err(|e| {
        tracing::debug!("Rejected feedback submission: {}", e);
        ApiError::from(e)
    })?;

    let assessment = state
        .assessor
        .assess(&feedback.title, &feedback.description)
        .await;

    let item = state
        .store
        .insert(&feedback, &assessment)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert feedback: {}", e);
            ApiError::Internal
        })?;

    tracing::info!(
        "Feedback stored: id={}, user_priority={}, ai_priority={}, source={:?}, safety_flag={}",
        item.id,
        item.user_priority,
        assessment.priority_score,
        assessment.source,
        item.safety_flag
    );

    Ok((StatusCode::CREATED, Json(SubmitResponse { item, assessment })))
}

async fn list_feedback(
    State(state): State<SharedState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<FeedbackItem>>, ApiError> {
    let filter = query.into_filter()?;
    let items = state.store.list_all().await.map_err(|e| {
        tracing::error!("Failed to fetch feedback: {}", e);
        ApiError::Internal
    })?;
    Ok(Json(filter.apply(items)))
}

async fn upvote_feedback(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let outcome = state.store.increment_upvote(id).await.map_err(|e| {
        tracing::error!("Failed to upvote feedback {}: {}", id, e);
        ApiError::Internal
    })?;

    match outcome {
        UpvoteOutcome::Applied => Ok(StatusCode::NO_CONTENT),
        UpvoteOutcome::NotFound => {
            tracing::debug!("Upvote for unknown feedback id {}", id);
            Err(ApiError::NotFound)
        }
    }
}
