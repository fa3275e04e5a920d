///! In-process feedback store for local runs without Postgres and for tests.
///! All writes go through one lock, so upvotes never lose increments.

use super::{FeedbackStore, StoreError, UpvoteOutcome};
use crate::domain::models::{FeedbackItem, NewFeedback};
use crate::services::assessment::AssessmentResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemoryFeedbackStore {
    items: Arc<RwLock<Vec<FeedbackItem>>>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a fully-formed row, keeping its timestamps as given.
    #[cfg(test)]
    pub async fn push(&self, item: FeedbackItem) {
        self.items.write().await.push(item);
    }

    fn next_created_at(items: &[FeedbackItem]) -> DateTime<Utc> {
        let now = Utc::now();
        match items.iter().map(|i| i.created_at).max() {
            Some(last) if last >= now => last + Duration::microseconds(1),
            _ => now,
        }
    }
}

#[async_trait]
impl FeedbackStore for MemoryFeedbackStore {
    async fn insert(&self, feedback: &NewFeedback, assessment: &AssessmentResult) -> Result<FeedbackItem, StoreError> {
        let mut items = self.items.write().await;
        let item = FeedbackItem {
            id: Uuid::new_v4(),
            title: feedback.title.clone(),
            description: feedback.description.clone(),
            user_priority: feedback.user_priority,
            tags: feedback.tag_strings(),
            ai_priority: Some(assessment.priority_score),
            safety_category: Some(assessment.safety_category.clone()),
            reasoning: Some(assessment.reasoning.clone()),
            key_concerns: assessment.key_concerns.clone(),
            safety_flag: assessment.is_safety_concern,
            created_at: Self::next_created_at(&items),
            upvotes: 0,
        };
        items.push(item.clone());
        Ok(item)
    }

    async fn list_all(&self) -> Result<Vec<FeedbackItem>, StoreError> {
        let mut items = self.items.read().await.clone();
        // later inserts win ties
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn increment_upvote(&self, id: Uuid) -> Result<UpvoteOutcome, StoreError> {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.upvotes += 1;
                Ok(UpvoteOutcome::Applied)
            }
            None => Ok(UpvoteOutcome::NotFound),
        }
    }
}
