//! Therapy recommendations per stress level.
//!
//! The table is built once and shared by every lookup.

use crate::types::*;
use once_cell::sync::Lazy;

/// Cached recommendation table, indexed by `StressLevel::index`
static RECOMMENDATIONS: Lazy<[TherapyRecommendation; 3]> = Lazy::new(|| {
    [
        TherapyRecommendation {
            primary: TherapyModality::Music,
            message: "Your stress level is low. Enjoy some calming music to maintain your peace."
                .into(),
            therapies: vec!["Music Therapy".into(), "Light Meditation".into()],
        },
        TherapyRecommendation {
            primary: TherapyModality::Yoga,
            message: "Your stress level is moderate. Try yoga or breathing exercises to relax."
                .into(),
            therapies: vec![
                "Yoga Therapy".into(),
                "Breathing Exercises".into(),
                "Music Therapy".into(),
            ],
        },
        TherapyRecommendation {
            primary: TherapyModality::Chatbot,
            message: "Your stress level is high. Let's talk with our AI assistant for support."
                .into(),
            therapies: vec![
                "AI Chatbot Support".into(),
                "Guided Meditation".into(),
                "Breathing Exercises".into(),
            ],
        },
    ]
});

/// Recommendation for a known stress level
pub fn recommend_therapy(level: StressLevel) -> &'static TherapyRecommendation {
    &RECOMMENDATIONS[level.index()]
}

/// Recommendation for a stored or user-supplied level label
///
/// Unknown labels fall back to the Moderate recommendation.
pub fn recommend_for_label(label: &str) -> &'static TherapyRecommendation {
    match StressLevel::parse(label) {
        Some(level) => recommend_therapy(level),
        None => {
            tracing::debug!("Unknown stress level '{}', using Moderate recommendation", label);
            recommend_therapy(StressLevel::Moderate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_modality_per_level() {
        assert_eq!(recommend_therapy(StressLevel::Low).primary, TherapyModality::Music);
        assert_eq!(recommend_therapy(StressLevel::Moderate).primary, TherapyModality::Yoga);
        assert_eq!(recommend_therapy(StressLevel::High).primary, TherapyModality::Chatbot);
    }

    #[test]
    fn test_therapy_order_is_preserved() {
        assert_eq!(
            recommend_therapy(StressLevel::High).therapies,
            vec!["AI Chatbot Support", "Guided Meditation", "Breathing Exercises"]
        );
        assert_eq!(
            recommend_therapy(StressLevel::Low).therapies,
            vec!["Music Therapy", "Light Meditation"]
        );
    }

    #[test]
    fn test_label_lookup_is_case_insensitive() {
        assert_eq!(recommend_for_label("high"), recommend_therapy(StressLevel::High));
        assert_eq!(recommend_for_label("Low"), recommend_therapy(StressLevel::Low));
    }

    // Unknown labels silently map to Moderate. Kept as-is; whether this
    // default is intended has not been confirmed.
    #[test]
    fn test_unknown_label_falls_back_to_moderate() {
        assert_eq!(recommend_for_label("Extreme"), recommend_therapy(StressLevel::Moderate));
        assert_eq!(recommend_for_label(""), recommend_therapy(StressLevel::Moderate));
    }

    #[test]
    fn test_recommendation_serializes_modality_snake_case() {
        let json = serde_json::to_value(recommend_therapy(StressLevel::High)).unwrap();
        assert_eq!(json["primary"], "chatbot");
        assert_eq!(json["therapies"][0], "AI Chatbot Support");
    }
}
