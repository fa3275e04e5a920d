use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 5000;
pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 5;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTag {
    Safety,
    Alignment,
    Performance,
    Ethics,
    Technical,
}

impl FeedbackTag {
    pub const ALL: [FeedbackTag; 5] = [
        Self::Safety,
        Self::Alignment,
        Self::Performance,
        Self::Ethics,
        Self::Technical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Alignment => "alignment",
            Self::Performance => "performance",
            Self::Ethics => "ethics",
            Self::Technical => "technical",
        }
    }
}

impl fmt::Display for FeedbackTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == wanted)
            .ok_or_else(|| ValidationError::UnknownTag(s.to_string()))
    }
}

/// A stored feedback item. Assessment fields are written once at insert.
#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct FeedbackItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[sqlx(rename = "priority")]
    pub user_priority: i32,
    pub tags: Vec<String>,
    pub ai_priority: Option<i32>,
    pub safety_category: Option<String>,
    pub reasoning: Option<String>,
    pub key_concerns: Vec<String>,
    pub safety_flag: bool,
    pub created_at: DateTime<Utc>,
    pub upvotes: i32,
}

impl FeedbackItem {
    pub fn is_high_priority(&self) -> bool {
        self.user_priority >= 4
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,
    #[error("description is required")]
    MissingDescription,
    #[error("priority is required")]
    MissingPriority,
    #[error("title exceeds {} characters", MAX_TITLE_CHARS)]
    TitleTooLong,
    #[error("description exceeds {} characters", MAX_DESCRIPTION_CHARS)]
    DescriptionTooLong,
    #[error("priority must be between 1 and 5, got {0}")]
    PriorityOutOfRange(i32),
    #[error("unknown tag '{0}'")]
    UnknownTag(String),
}

/// Raw submission as it arrives over the wire. Absent fields are
/// reported by `validate`, not by the JSON decoder.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSubmission {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A submission that passed validation and may be scored and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub title: String,
    pub description: String,
    pub user_priority: i32,
    pub tags: Vec<FeedbackTag>,
}

impl NewFeedback {
    pub fn tag_strings(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.as_str().to_string()).collect()
    }
}

impl FeedbackSubmission {
    pub fn validate(self) -> Result<NewFeedback, ValidationError> {
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();

        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if description.is_empty() {
            return Err(ValidationError::MissingDescription);
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ValidationError::TitleTooLong);
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ValidationError::DescriptionTooLong);
        }
        let priority = self.priority.ok_or(ValidationError::MissingPriority)?;
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(ValidationError::PriorityOutOfRange(priority));
        }

        // Order is kept for display; repeats are dropped.
        let mut tags = Vec::with_capacity(self.tags.len());
        for raw in &self.tags {
            let tag: FeedbackTag = raw.parse()?;
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Ok(NewFeedback {
            title,
            description,
            user_priority: priority,
            tags,
        })
    }
}
