pub mod memory;
pub mod timed;

use crate::config::DatabaseSettings;
use crate::domain::models::{FeedbackItem, NewFeedback};
use crate::services::assessment::AssessmentResult;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

pub use memory::MemoryFeedbackStore;
pub use timed::TimeoutStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpvoteOutcome {
    Applied,
    NotFound,
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Stores a scored submission; the store assigns `id` and `created_at`.
    async fn insert(&self, feedback: &NewFeedback, assessment: &AssessmentResult) -> Result<FeedbackItem, StoreError>;

    /// Newest first.
    async fn list_all(&self) -> Result<Vec<FeedbackItem>, StoreError>;

    /// Single-statement increment; unknown ids report `NotFound`.
    async fn increment_upvote(&self, id: Uuid) -> Result<UpvoteOutcome, StoreError>;
}

const FEEDBACK_COLUMNS: &str = "id, title, description, priority, tags, ai_priority, safety_category, \
     reasoning, key_concerns, safety_flag, created_at, upvotes";

#[derive(Clone)]
pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(settings: &DatabaseSettings, url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn insert(&self, feedback: &NewFeedback, assessment: &AssessmentResult) -> Result<FeedbackItem, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO feedback (
                id, title, description, priority, tags, ai_priority,
                safety_category, reasoning, key_concerns, safety_flag
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {FEEDBACK_COLUMNS}
            "#
        );

        let item = sqlx::query_as::<_, FeedbackItem>(&sql)
            .bind(Uuid::new_v4())
            .bind(&feedback.title)
            .bind(&feedback.description)
            .bind(feedback.user_priority)
            .bind(feedback.tag_strings())
            .bind(assessment.priority_score)
            .bind(&assessment.safety_category)
            .bind(&assessment.reasoning)
            .bind(&assessment.key_concerns)
            .bind(assessment.is_safety_concern)
            .fetch_one(&self.pool)
            .await?;

        Ok(item)
    }

    async fn list_all(&self) -> Result<Vec<FeedbackItem>, StoreError> {
        let sql = format!("SELECT {FEEDBACK_COLUMNS} FROM feedback ORDER BY created_at DESC, id DESC");
        let items = sqlx::query_as::<_, FeedbackItem>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn increment_upvote(&self, id: Uuid) -> Result<UpvoteOutcome, StoreError> {
        let result = sqlx::query("UPDATE feedback SET upvotes = upvotes + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            Ok(UpvoteOutcome::NotFound)
        } else {
            Ok(UpvoteOutcome::Applied)
        }
    }
}
