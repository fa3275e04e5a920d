pub mod dashboard;
pub mod feedback;
pub mod summary;

use crate::analytics::dashboard::FeedbackFilter;
use crate::domain::models::ValidationError;
use crate::state::SharedState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/feedback", feedback::router(state.clone()))
        .nest("/dashboard", dashboard::router(state.clone()))
        .nest("/summary", summary::router(state))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    Internal,
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Filter query shared by listing and dashboard endpoints,
/// e.g. `?priorities=4,5&safety_only=true&tags=safety,ethics`.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub priorities: Option<String>,
    pub safety_only: Option<bool>,
    pub tags: Option<String>,
}

impl FilterQuery {
    pub fn into_filter(self) -> Result<FeedbackFilter, ApiError> {
        let priorities = split_list(self.priorities.as_deref())
            .into_iter()
            .map(|p| {
                p.parse::<i32>()
                    .map_err(|_| ApiError::BadRequest(format!("invalid priority '{p}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FeedbackFilter {
            priorities,
            safety_only: self.safety_only.unwrap_or(false),
            tags: split_list(self.tags.as_deref())
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
        })
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
