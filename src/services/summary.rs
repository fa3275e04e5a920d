///! Aggregate metrics and the AI executive summary over stored feedback.
///! Metrics are always returned, even when the narrative call fails.

use crate::domain::models::FeedbackItem;
use crate::services::ai::{parse_json, AiError, CompletionBackend, CompletionOptions};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub const RECENT_WINDOW_DAYS: i64 = 7;
pub const TOP_TAG_LIMIT: usize = 5;
pub const SAMPLE_LIMIT: usize = 5;
pub const SAMPLE_DESCRIPTION_CHARS: usize = 200;

const SYSTEM_PROMPT: &str =
    "You are an AI safety expert analyzing feedback trends and generating executive summaries.";

// provider default temperature
const OPTIONS: CompletionOptions = CompletionOptions {
    json: true,
    temperature: None,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AggregateMetrics {
    pub total_feedback: usize,
    pub recent_feedback: usize,
    pub high_priority: usize,
    pub safety_concerns: usize,
    pub avg_priority: f64,
    pub top_tags: Vec<TagCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Narrative {
    pub executive_summary: String,
    pub key_recommendations: Vec<String>,
    pub risk_assessment: String,
    pub focus_areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SummaryBody {
    Narrative(Narrative),
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExecutiveSummary {
    #[serde(flatten)]
    pub body: SummaryBody,
    pub metrics: AggregateMetrics,
    pub generated_at: DateTime<Utc>,
}

impl ExecutiveSummary {
    #[cfg(test)]
    pub fn narrative(&self) -> Option<&Narrative> {
        match &self.body {
            SummaryBody::Narrative(n) => Some(n),
            SummaryBody::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.body {
            SummaryBody::Failed { error } => Some(error),
            SummaryBody::Narrative(_) => None,
        }
    }
}

/// Count tag occurrences; highest count first, ties in first-seen order.
pub fn tag_frequencies<'a, I>(tag_lists: I) -> Vec<TagCount>
where
    I: IntoIterator<Item = &'a Vec<String>>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for tag in tag_lists.into_iter().flatten() {
        let entry = counts.entry(tag.clone()).or_insert(0);
        if *entry == 0 {
            order.push(tag.clone());
        }
        *entry += 1;
    }

    let mut ranked: Vec<TagCount> = order
        .into_iter()
        .map(|tag| {
            let count = counts.get(&tag).copied().unwrap_or(0);
            TagCount { tag, count }
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

pub fn summarize_metrics(items: &[FeedbackItem], now: DateTime<Utc>) -> AggregateMetrics {
    if items.is_empty() {
        return AggregateMetrics::default();
    }

    let since = now - Duration::days(RECENT_WINDOW_DAYS);
    let total: i64 = items.iter().map(|i| i.user_priority as i64).sum();
    let mean = total as f64 / items.len() as f64;

    let mut top_tags = tag_frequencies(items.iter().map(|i| &i.tags));
    top_tags.truncate(TOP_TAG_LIMIT);

    AggregateMetrics {
        total_feedback: items.len(),
        recent_feedback: items.iter().filter(|i| i.created_at >= since).count(),
        high_priority: items.iter().filter(|i| i.is_high_priority()).count(),
        safety_concerns: items.iter().filter(|i| i.safety_flag).count(),
        avg_priority: round_half_even(mean, 2),
        top_tags,
    }
}

/// Rounds to `decimals` places with ties going to the even neighbour,
/// so 2.125 becomes 2.12 and 2.375 becomes 2.38.
fn round_half_even(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let scaled = value * scale;
    let rounded = if (scaled - scaled.trunc()).abs() == 0.5 {
        2.0 * (scaled / 2.0).round()
    } else {
        scaled.round()
    };
    rounded / scale
}

fn sample_line(item: &FeedbackItem) -> String {
    let excerpt: String = item
        .description
        .chars()
        .take(SAMPLE_DESCRIPTION_CHARS)
        .collect();
    format!("{}: {}...", item.title, excerpt)
}

fn sample_block(lines: &[String]) -> String {
    if lines.is_empty() {
        "None".to_string()
    } else {
        lines
            .iter()
            .map(|l| format!("- {l}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn build_prompt(metrics: &AggregateMetrics, high_priority: &[String], safety: &[String]) -> String {
    let tags = if metrics.top_tags.is_empty() {
        "None".to_string()
    } else {
        metrics
            .top_tags
            .iter()
            .map(|t| format!("{} ({})", t.tag, t.count))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        r#"Generate an executive summary of AI safety feedback data with the following structure:
Key Metrics:
- Total Feedback: {total}
- Recent Feedback (7 days): {recent}
- High Priority Items: {high}
- Safety Concerns: {safety_count}
- Average Priority: {avg}
- Top Tags: {tags}

High Priority Feedback:
{high_block}

Safety Concerns:
{safety_block}

Respond with a single JSON object with these fields:
- executive_summary: string, 2-3 paragraphs highlighting key insights
- key_recommendations: array of 3-5 actionable items
- risk_assessment: string, brief assessment of identified safety risks
- focus_areas: array of 2-3 areas needing immediate attention"#,
        total = metrics.total_feedback,
        recent = metrics.recent_feedback,
        high = metrics.high_priority,
        safety_count = metrics.safety_concerns,
        avg = metrics.avg_priority,
        high_block = sample_block(high_priority),
        safety_block = sample_block(safety),
    )
}

pub struct SummaryGenerator {
    backend: Arc<dyn CompletionBackend>,
}

impl SummaryGenerator {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate_executive_summary(
        &self,
        items: &[FeedbackItem],
        now: DateTime<Utc>,
    ) -> ExecutiveSummary {
        let metrics = summarize_metrics(items, now);

        let high_priority: Vec<String> = items
            .iter()
            .filter(|i| i.is_high_priority())
            .take(SAMPLE_LIMIT)
            .map(sample_line)
            .collect();
        let safety: Vec<String> = items
            .iter()
            .filter(|i| i.safety_flag)
            .take(SAMPLE_LIMIT)
            .map(sample_line)
            .collect();

        let prompt = build_prompt(&metrics, &high_priority, &safety);

        let body = match self.narrative(&prompt).await {
            Ok(narrative) => SummaryBody::Narrative(narrative),
            Err(err) => {
                tracing::warn!("Executive summary generation failed: {}", err);
                SummaryBody::Failed {
                    error: format!("Failed to generate AI summary: {err}"),
                }
            }
        };

        ExecutiveSummary {
            body,
            metrics,
            generated_at: now,
        }
    }

    async fn narrative(&self, prompt: &str) -> Result<Narrative, AiError> {
        let raw = self.backend.complete(SYSTEM_PROMPT, prompt, OPTIONS).await?;
        let narrative: Narrative = parse_json(&raw)?;
        if narrative.executive_summary.trim().is_empty() {
            return Err(AiError::Malformed("empty executive_summary".to_string()));
        }
        Ok(narrative)
    }
}

#[cfg(test)]
pub mod fixtures {
    use super::*;
    use uuid::Uuid;

    pub fn item(priority: i32, tags: &[&str], safety_flag: bool, created_at: DateTime<Utc>) -> FeedbackItem {
        FeedbackItem {
            id: Uuid::new_v4(),
            title: format!("Item p{priority}"),
            description: "Some description".to_string(),
            user_priority: priority,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ai_priority: None,
            safety_category: None,
            reasoning: None,
            key_concerns: Vec::new(),
            safety_flag,
            created_at,
            upvotes: 0,
        }
    }
}
