//! Textual hints derived from a scored results page.

use crate::features::{FeatureKind, SerpFeatureSet};
use crate::score::ScoreFactors;

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInput<'a> {
    pub features: &'a SerpFeatureSet,
    pub factors: &'a ScoreFactors,
    pub difficulty: f64,
    pub opportunity: f64,
}

struct Rule {
    applies: fn(&RecommendationInput<'_>) -> bool,
    hint: &'static str,
}

/// Evaluated in order; every rule that applies contributes its hint.
const RULES: &[Rule] = &[
    Rule {
        applies: |i| i.factors.feature_availability >= 60.0,
        hint: "Target the detected SERP features: structure content so it can be pulled into them.",
    },
    Rule {
        applies: |i| i.features.is_present(FeatureKind::AnswerBox),
        hint: "An answer box is shown: add a concise 40-60 word answer paragraph near the top of the page.",
    },
    Rule {
        applies: |i| i.features.is_present(FeatureKind::RelatedQuestions),
        hint: "Related questions are shown: add an FAQ section answering them.",
    },
    Rule {
        applies: |i| i.features.is_present(FeatureKind::VideoCluster),
        hint: "Videos rank for this keyword: produce a short video and embed it on the page.",
    },
    Rule {
        applies: |i| i.difficulty >= 70.0,
        hint: "Competition is high: target long-tail variants of this keyword first.",
    },
    Rule {
        applies: |i| i.factors.rank_gap >= 80.0,
        hint: "You are not on page one: build topical content and internal links around this keyword.",
    },
    Rule {
        applies: |i| i.factors.content_gap >= 50.0,
        hint: "Competitors outrank you: study their top pages for missing topics and depth.",
    },
    Rule {
        applies: |i| i.difficulty < 40.0 && i.opportunity >= 60.0,
        hint: "Low difficulty and high opportunity: prioritise this keyword.",
    },
];

#[must_use]
pub fn recommendations(input: &RecommendationInput<'_>) -> Vec<String> {
    RULES
        .iter()
        .filter(|rule| (rule.applies)(input))
        .map(|rule| rule.hint.to_owned())
        .collect()
}
