use crate::store::types::{SuggestedAction, Suggestion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Lesson,
    Quiz,
    General,
}

// Ordered; first match wins.
const KEYWORD_RULES: &[(&str, Intent)] = &[
    ("lesson plan", Intent::Lesson),
    ("quiz", Intent::Quiz),
];

/// A declared generator intent wins over keyword sniffing of the user's
/// literal text.
pub fn classify(declared: Option<Intent>, user_text: &str) -> Intent {
    if let Some(intent) = declared {
        return intent;
    }
    let lowered = user_text.to_lowercase();
    for (keyword, intent) in KEYWORD_RULES {
        if lowered.contains(keyword) {
            return *intent;
        }
    }
    Intent::General
}

pub fn suggestions_for(intent: Intent) -> Vec<Suggestion> {
    match intent {
        Intent::Lesson => vec![
            Suggestion {
                label: "Generate a quiz from this lesson".to_string(),
                action: SuggestedAction::Quiz,
                seed_prompt: Some("Write a quiz covering the lesson plan above.".to_string()),
            },
            Suggestion {
                label: "Create a grading rubric".to_string(),
                action: SuggestedAction::Rubric,
                seed_prompt: Some(
                    "Create a grading rubric for the main activity in the lesson plan above."
                        .to_string(),
                ),
            },
        ],
        Intent::Quiz => vec![Suggestion {
            label: "Explain the answer key".to_string(),
            action: SuggestedAction::Chat,
            seed_prompt: Some(
                "Explain the reasoning behind each answer in the quiz above.".to_string(),
            ),
        }],
        Intent::General => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_intent_wins_over_keywords() {
        assert_eq!(classify(Some(Intent::Quiz), "make me a lesson plan"), Intent::Quiz);
        assert_eq!(classify(Some(Intent::General), "quiz time"), Intent::General);
    }

    #[test]
    fn test_keyword_rules_match_user_text() {
        assert_eq!(classify(None, "Can you draft a Lesson Plan on fractions?"), Intent::Lesson);
        assert_eq!(classify(None, "give me a quick quiz"), Intent::Quiz);
        assert_eq!(classify(None, "what's the capital of France?"), Intent::General);
    }

    #[test]
    fn test_lesson_plan_keyword_outranks_quiz() {
        // Both keywords present: the earlier rule wins.
        assert_eq!(
            classify(None, "a lesson plan ending with a quiz"),
            Intent::Lesson
        );
    }

    #[test]
    fn test_lesson_intent_offers_quiz_and_rubric() {
        let suggestions = suggestions_for(Intent::Lesson);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].action, SuggestedAction::Quiz);
        assert_eq!(suggestions[1].action, SuggestedAction::Rubric);
    }

    #[test]
    fn test_quiz_intent_offers_answer_key_explanation() {
        let suggestions = suggestions_for(Intent::Quiz);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].action, SuggestedAction::Chat);
        assert!(suggestions[0].seed_prompt.is_some());
    }

    #[test]
    fn test_general_intent_offers_nothing() {
        assert!(suggestions_for(Intent::General).is_empty());
    }
}
