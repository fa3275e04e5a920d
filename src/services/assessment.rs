///! Per-item safety assessment: model scoring with a keyword-only fallback.
///! The safety flag always comes from the keyword scan.

use crate::services::ai::{parse_json, AiError, CompletionBackend, CompletionOptions};
use crate::services::keywords::{self, KeywordFlag, KeywordScan};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const FALLBACK_CATEGORY: &str = "automatic_fallback";
pub const FALLBACK_REASONING: &str = "AI analysis failed, using keyword-based scoring";

const SYSTEM_PROMPT: &str =
    "You are an AI safety expert analyzing feedback for potential risks and safety implications.";

const OPTIONS: CompletionOptions = CompletionOptions {
    json: true,
    temperature: Some(0.3),
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    Model,
    KeywordFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentResult {
    pub priority_score: i32,
    pub safety_category: String,
    pub reasoning: String,
    pub key_concerns: Vec<String>,
    pub is_safety_concern: bool,
    pub keyword_flags: Vec<KeywordFlag>,
    pub source: AssessmentSource,
}

/// Shape the model is asked to return. Every field is required.
#[derive(Debug, Deserialize)]
struct ModelAssessment {
    priority_score: i32,
    safety_category: String,
    reasoning: String,
    key_concerns: Vec<String>,
}

impl ModelAssessment {
    fn validated(self) -> Result<Self, AiError> {
        if !(1..=5).contains(&self.priority_score) {
            return Err(AiError::Malformed(format!(
                "priority_score {} outside 1-5",
                self.priority_score
            )));
        }
        if self.safety_category.trim().is_empty() || self.reasoning.trim().is_empty() {
            return Err(AiError::Malformed("empty category or reasoning".to_string()));
        }
        Ok(self)
    }
}

pub struct SafetyAssessor {
    backend: Arc<dyn CompletionBackend>,
}

impl SafetyAssessor {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Never fails; falls back to keyword scoring on any model problem.
    pub async fn assess(&self, title: &str, description: &str) -> AssessmentResult {
        let scan = keywords::scan(description);

        match self.model_assessment(title, description).await {
            Ok(model) => AssessmentResult {
                priority_score: model.priority_score,
                safety_category: model.safety_category,
                reasoning: model.reasoning,
                key_concerns: model.key_concerns,
                is_safety_concern: scan.is_safety_concern,
                keyword_flags: scan.flags,
                source: AssessmentSource::Model,
            },
            Err(err) => {
                tracing::warn!("AI assessment failed, using keyword fallback: {}", err);
                fallback_assessment(scan)
            }
        }
    }

    async fn model_assessment(&self, title: &str, description: &str) -> Result<ModelAssessment, AiError> {
        let prompt = build_prompt(title, description);
        let raw = self.backend.complete(SYSTEM_PROMPT, &prompt, OPTIONS).await?;
        parse_json::<ModelAssessment>(&raw)?.validated()
    }
}

/// Keyword-only result. The score is `flags + 1` and is not clamped to 5.
pub fn fallback_assessment(scan: KeywordScan) -> AssessmentResult {
    AssessmentResult {
        priority_score: scan.flag_count() as i32 + 1,
        safety_category: FALLBACK_CATEGORY.to_string(),
        reasoning: FALLBACK_REASONING.to_string(),
        key_concerns: scan.categories(),
        is_safety_concern: scan.is_safety_concern,
        keyword_flags: scan.flags,
        source: AssessmentSource::KeywordFallback,
    }
}

fn build_prompt(title: &str, description: &str) -> String {
    format!(
        r#"Analyze this AI safety feedback and rate its priority (1-5):
Title: {title}
Description: {description}

Consider these aspects:
1. Immediate safety implications
2. Potential risks and consequences
3. Alignment with AI safety goals
4. Time sensitivity
5. Scale of impact

Respond with a single JSON object with exactly these fields:
- priority_score: integer 1-5, where 5 is highest priority
- safety_category: string, e.g. "immediate concern", "potential risk", "minor issue"
- reasoning: string, brief explanation
- key_concerns: array of strings, the main safety implications"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai::testing::ScriptedBackend;
    use crate::services::ai::TimedBackend;
    use std::time::Duration;

    fn assessor(backend: ScriptedBackend) -> (SafetyAssessor, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        (SafetyAssessor::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_fallback_on_transport_error() {
        let (assessor, _) = assessor(ScriptedBackend::failing());
        let result = assessor
            .assess("Odd output", "The model showed deceptive and adversarial responses")
            .await;

        assert_eq!(result.source, AssessmentSource::KeywordFallback);
        assert_eq!(result.priority_score, 3);
        assert_eq!(result.safety_category, FALLBACK_CATEGORY);
        assert_eq!(result.reasoning, FALLBACK_REASONING);
        assert_eq!(result.key_concerns, vec!["behavior"]);
        assert!(result.is_safety_concern);
        assert_eq!(result.keyword_flags.len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_without_flags_scores_one() {
        let (assessor, _) = assessor(ScriptedBackend::failing());
        let result = assessor.assess("Slow page", "Charts take ages to load").await;

        assert_eq!(result.priority_score, 1);
        assert!(!result.is_safety_concern);
        assert!(result.key_concerns.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_score_is_not_clamped() {
        let (assessor, _) = assessor(ScriptedBackend::failing());
        let description = "misaligned goals, existential risk, control problem, deceptive manipulation";
        let result = assessor.assess("Many issues", description).await;

        // five flags -> 6, above the nominal 1-5 range
        assert_eq!(result.keyword_flags.len(), 5);
        assert_eq!(result.priority_score, 6);
    }

    #[tokio::test]
    async fn test_scan_uses_description_only() {
        let (assessor, _) = assessor(ScriptedBackend::failing());
        let result = assessor.assess("Existential risk!", "Button colour is off").await;

        assert!(!result.is_safety_concern);
        assert_eq!(result.priority_score, 1);
    }

    #[tokio::test]
    async fn test_model_result_with_keyword_overlay() {
        let reply = r#"{
            "priority_score": 5,
            "safety_category": "immediate concern",
            "reasoning": "Model evades oversight",
            "key_concerns": ["oversight evasion"]
        }"#;
        let (assessor, backend) = assessor(ScriptedBackend::replying(reply));
        let result = assessor.assess("Oversight", "The agent ignores shutdown requests").await;

        assert_eq!(result.source, AssessmentSource::Model);
        assert_eq!(result.priority_score, 5);
        assert_eq!(result.safety_category, "immediate concern");
        assert_eq!(result.key_concerns, vec!["oversight evasion"]);
        // the model calls it an immediate concern but no phrase matched
        assert!(!result.is_safety_concern);
        assert!(result.keyword_flags.is_empty());

        let prompt = backend.last_prompt().unwrap();
        assert!(prompt.contains("Title: Oversight"));
        assert!(prompt.contains("Description: The agent ignores shutdown requests"));
        assert!(prompt.contains("Time sensitivity"));
        assert!(prompt.contains("Scale of impact"));
        assert_eq!(backend.last_options().unwrap().temperature, Some(0.3));
    }

    #[tokio::test]
    async fn test_model_minor_issue_still_flagged_by_keywords() {
        let reply = r#"{"priority_score": 1, "safety_category": "minor issue",
            "reasoning": "cosmetic", "key_concerns": []}"#;
        let (assessor, _) = assessor(ScriptedBackend::replying(reply));
        let result = assessor.assess("Note", "Possible manipulation in replies").await;

        assert_eq!(result.source, AssessmentSource::Model);
        assert_eq!(result.safety_category, "minor issue");
        assert!(result.is_safety_concern);
        assert_eq!(result.keyword_flags[0].keyword, "manipulation");
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back() {
        for reply in [
            "{'priority_score': 4}",
            r#"{"priority_score": 4, "safety_category": "x", "reasoning": "y"}"#,
            r#"{"priority_score": 9, "safety_category": "x", "reasoning": "y", "key_concerns": []}"#,
            r#"{"priority_score": "high", "safety_category": "x", "reasoning": "y", "key_concerns": []}"#,
        ] {
            let (assessor, _) = assessor(ScriptedBackend::replying(reply));
            let result = assessor.assess("t", "harmful behavior observed").await;
            assert_eq!(result.source, AssessmentSource::KeywordFallback, "reply: {reply}");
            assert_eq!(result.priority_score, 2);
            assert!(result.is_safety_concern);
        }
    }

    #[tokio::test]
    async fn test_slow_model_falls_back_after_timeout() {
        let reply = r#"{"priority_score": 5, "safety_category": "immediate concern",
            "reasoning": "late", "key_concerns": []}"#;
        let slow = ScriptedBackend::replying(reply).with_delay(Duration::from_millis(500));
        let assessor = SafetyAssessor::new(Arc::new(TimedBackend::new(
            Arc::new(slow),
            Duration::from_millis(20),
        )));

        let result = assessor.assess("Stalled", "deceptive replies under load").await;

        assert_eq!(result.source, AssessmentSource::KeywordFallback);
        assert_eq!(result.priority_score, 2);
        assert_eq!(result.safety_category, FALLBACK_CATEGORY);
        assert!(result.is_safety_concern);
    }
}
