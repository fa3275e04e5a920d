use crate::domain::models::FeedbackItem;
use crate::services::summary::{tag_frequencies, TagCount};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedbackFilter {
    /// Empty means every priority.
    pub priorities: Vec<i32>,
    pub safety_only: bool,
    /// Keep items carrying any of these tags. Empty means no tag filter.
    pub tags: Vec<String>,
}

impl FeedbackFilter {
    pub fn matches(&self, item: &FeedbackItem) -> bool {
        if !self.priorities.is_empty() && !self.priorities.contains(&item.user_priority) {
            return false;
        }
        if self.safety_only && !item.safety_flag {
            return false;
        }
        if !self.tags.is_empty() && !item.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        true
    }

    pub fn apply(&self, items: Vec<FeedbackItem>) -> Vec<FeedbackItem> {
        items.into_iter().filter(|i| self.matches(i)).collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PriorityCount {
    pub priority: i32,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DashboardView {
    pub total_feedback: usize,
    pub high_priority: usize,
    pub safety_concerns: usize,
    pub daily_submissions: Vec<DailyCount>,
    pub priority_distribution: Vec<PriorityCount>,
    pub tag_distribution: Vec<TagCount>,
}

pub fn build_dashboard(items: &[FeedbackItem]) -> DashboardView {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut per_priority: BTreeMap<i32, usize> = BTreeMap::new();

    for item in items {
        *per_day.entry(item.created_at.date_naive()).or_insert(0) += 1;
        *per_priority.entry(item.user_priority).or_insert(0) += 1;
    }

    DashboardView {
        total_feedback: items.len(),
        high_priority: items.iter().filter(|i| i.is_high_priority()).count(),
        safety_concerns: items.iter().filter(|i| i.safety_flag).count(),
        daily_submissions: per_day
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect(),
        priority_distribution: per_priority
            .into_iter()
            .map(|(priority, count)| PriorityCount { priority, count })
            .collect(),
        tag_distribution: tag_frequencies(items.iter().map(|i| &i.tags)),
    }
}
