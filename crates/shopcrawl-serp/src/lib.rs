pub mod analyzer;
pub mod error;
pub mod features;
pub mod organic;
pub mod recommend;
pub mod score;

pub use analyzer::{SerpAnalyzer, SerpConfig, SerpReport, DEFAULT_SEARCH_URL};
pub use error::SerpError;
pub use features::{FeatureDetector, FeatureKind, FeatureResult, SerpFeatureSet};
pub use organic::{extract_organic, parse_total_results, OrganicResult};
pub use recommend::{recommendations, RecommendationInput};
pub use score::{
    clamp_score, compute_factors, difficulty_score, opportunity_score, own_rank, rank_gap_factor,
    ScoreFactors,
};
