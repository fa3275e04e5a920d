use super::{FeedbackStore, StoreError, UpvoteOutcome};
use crate::domain::models::{FeedbackItem, NewFeedback};
use crate::services::assessment::AssessmentResult;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

/// Puts a time limit on every call of the wrapped store.
pub struct TimeoutStore {
    inner: Arc<dyn FeedbackStore>,
    limit: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn FeedbackStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        timeout(self.limit, call)
            .await
            .map_err(|_| StoreError::Timeout(self.limit))?
    }
}

#[async_trait]
impl FeedbackStore for TimeoutStore {
    async fn insert(&self, feedback: &NewFeedback, assessment: &AssessmentResult) -> Result<FeedbackItem, StoreError> {
        self.bounded(self.inner.insert(feedback, assessment)).await
    }

    async fn list_all(&self) -> Result<Vec<FeedbackItem>, StoreError> {
        self.bounded(self.inner.list_all()).await
    }

    async fn increment_upvote(&self, id: Uuid) -> Result<UpvoteOutcome, StoreError> {
        self.bounded(self.inner.increment_upvote(id)).await
    }
}
