use serde::{Deserialize, Serialize};

/// Category name and its trigger phrases, in reporting order.
pub const SAFETY_TAXONOMY: &[(&str, &[&str])] = &[
    (
        "alignment",
        &[
            "misaligned",
            "value alignment",
            "goal alignment",
            "ethical concerns",
            "safety concerns",
        ],
    ),
    (
        "risks",
        &[
            "catastrophic risk",
            "existential risk",
            "safety risk",
            "unintended consequences",
            "control problem",
        ],
    ),
    (
        "behavior",
        &[
            "unexpected behavior",
            "harmful behavior",
            "deceptive",
            "manipulation",
            "adversarial",
        ],
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordFlag {
    pub category: String,
    pub keyword: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct KeywordScan {
    pub is_safety_concern: bool,
    pub flags: Vec<KeywordFlag>,
}

impl KeywordScan {
    /// Distinct categories in the order their first flag appeared.
    pub fn categories(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for flag in &self.flags {
            if !seen.contains(&flag.category) {
                seen.push(flag.category.clone());
            }
        }
        seen
    }

    pub fn flag_count(&self) -> usize {
        self.flags.len()
    }
}

pub fn scan(text: &str) -> KeywordScan {
    let lowered = text.to_lowercase();
    let mut flags = Vec::new();

    for (category, phrases) in SAFETY_TAXONOMY {
        for phrase in phrases.iter() {
            if lowered.contains(phrase) {
                flags.push(KeywordFlag {
                    category: (*category).to_string(),
                    keyword: (*phrase).to_string(),
                });
            }
        }
    }

    KeywordScan {
        is_safety_concern: !flags.is_empty(),
        flags,
    }
}

/// 0.2 per matched phrase. Not capped at 1.0.
#[deprecated(note = "use `scan` and read the flags directly")]
#[allow(dead_code)]
pub fn legacy_score(text: &str) -> f64 {
    scan(text).flag_count() as f64 * 0.2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_phrases_no_flags() {
        let result = scan("The dashboard loads slowly on Mondays");
        assert!(!result.is_safety_concern);
        assert!(result.flags.is_empty());
        assert!(result.categories().is_empty());
    }

    #[test]
    fn test_case_insensitive_match() {
        let result = scan("DECEPTIVE behavior");
        assert!(result.is_safety_concern);
        assert_eq!(
            result.flags,
            vec![KeywordFlag {
                category: "behavior".to_string(),
                keyword: "deceptive".to_string(),
            }]
        );
    }

    #[test]
    fn test_flags_follow_taxonomy_order() {
        let result = scan("Adversarial prompts show an existential risk and the model is misaligned");
        let pairs: Vec<(&str, &str)> = result
            .flags
            .iter()
            .map(|f| (f.category.as_str(), f.keyword.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("alignment", "misaligned"),
                ("risks", "existential risk"),
                ("behavior", "adversarial"),
            ]
        );
        assert_eq!(result.categories(), vec!["alignment", "risks", "behavior"]);
    }

    #[test]
    fn test_overlapping_phrases_each_reported() {
        // "safety concerns" and "safety risk" are separate phrases
        let result = scan("safety concerns about a safety risk");
        assert_eq!(result.flag_count(), 2);
        assert_eq!(result.categories(), vec!["alignment", "risks"]);
    }

    #[test]
    #[allow(deprecated)]
    fn test_legacy_score_is_uncapped() {
        assert_eq!(legacy_score("nothing here"), 0.0);
        let text = "misaligned, deceptive manipulation, adversarial, control problem, existential risk";
        let score = legacy_score(text);
        assert!((score - 1.2).abs() < 1e-9, "got {score}");
    }
}
