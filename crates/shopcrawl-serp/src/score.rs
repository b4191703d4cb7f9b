//! Difficulty and opportunity scoring.
//!
//! Every factor is a 0–100 sub-score. Factors are clamped before weighting
//! and the blended scores are clamped again, so out-of-range or non-finite
//! inputs can never escape `[0, 100]`.

use serde::{Deserialize, Serialize};
use shopcrawl_scraper::urls::host_matches;

use crate::features::{FeatureKind, SerpFeatureSet};
use crate::organic::OrganicResult;

pub const DIFFICULTY_WEIGHTS: Weights = Weights(0.3, 0.4, 0.3);
pub const OPPORTUNITY_WEIGHTS: Weights = Weights(0.3, 0.4, 0.3);

/// Organic results considered "page one".
pub const TOP_RESULTS: usize = 10;

/// Result counts mapped onto the volume factor: `10^3` → 0, `10^9` → 100.
const VOLUME_LOG_FLOOR: f64 = 3.0;
const VOLUME_LOG_CEIL: f64 = 9.0;
const UNKNOWN_VOLUME: f64 = 50.0;

/// Estimated authority by domain class.
const HIGH_AUTHORITY: f64 = 95.0;
const INSTITUTIONAL_AUTHORITY: f64 = 90.0;
const COMPETITOR_AUTHORITY: f64 = 70.0;
const DEFAULT_AUTHORITY: f64 = 40.0;

const NO_COMPETITORS_CONTENT_GAP: f64 = 50.0;

/// Domains that dominate commerce and reference results.
const HIGH_AUTHORITY_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "amazon.com",
    "youtube.com",
    "facebook.com",
    "reddit.com",
    "linkedin.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "pinterest.com",
    "ebay.com",
    "walmart.com",
    "etsy.com",
    "target.com",
    "ikea.com",
    "quora.com",
    "nytimes.com",
    "forbes.com",
    "bbc.co.uk",
    "apple.com",
    "microsoft.com",
    "github.com",
];

/// Three factor weights, in factor order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights(pub f64, pub f64, pub f64);

/// All six factor sub-scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactors {
    pub result_volume: f64,
    pub top_domain_authority: f64,
    pub feature_density: f64,
    pub rank_gap: f64,
    pub feature_availability: f64,
    pub content_gap: f64,
}

/// Clamps `value` into `[0, 100]`; `NaN` becomes 0.
#[must_use]
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn blend(a: f64, b: f64, c: f64, w: Weights) -> f64 {
    clamp_score(w.0 * clamp_score(a) + w.1 * clamp_score(b) + w.2 * clamp_score(c))
}

#[must_use]
pub fn difficulty_score(f: &ScoreFactors) -> f64 {
    blend(
        f.result_volume,
        f.top_domain_authority,
        f.feature_density,
        DIFFICULTY_WEIGHTS,
    )
}

#[must_use]
pub fn opportunity_score(f: &ScoreFactors) -> f64 {
    blend(
        f.rank_gap,
        f.feature_availability,
        f.content_gap,
        OPPORTUNITY_WEIGHTS,
    )
}

/// `log10(total)` mapped linearly from 3 → 0 to 9 → 100. Unknown → 50.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn result_volume_factor(total_results: Option<u64>) -> f64 {
    match total_results {
        None => UNKNOWN_VOLUME,
        Some(0) => 0.0,
        Some(total) => {
            let log = (total as f64).log10();
            clamp_score((log - VOLUME_LOG_FLOOR) / (VOLUME_LOG_CEIL - VOLUME_LOG_FLOOR) * 100.0)
        }
    }
}

/// Estimated authority of one domain.
#[must_use]
pub fn domain_authority(domain: &str, competitors: &[String]) -> f64 {
    let domain = domain.to_ascii_lowercase();
    if HIGH_AUTHORITY_DOMAINS
        .iter()
        .any(|known| host_matches(&domain, known))
    {
        HIGH_AUTHORITY
    } else if domain.ends_with(".gov") || domain.ends_with(".edu") {
        INSTITUTIONAL_AUTHORITY
    } else if competitors.iter().any(|c| host_matches(&domain, c)) {
        COMPETITOR_AUTHORITY
    } else {
        DEFAULT_AUTHORITY
    }
}

/// Mean estimated authority of the top organic domains; 0 without results.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn top_domain_authority_factor(organic: &[OrganicResult], competitors: &[String]) -> f64 {
    let top: Vec<f64> = organic
        .iter()
        .take(TOP_RESULTS)
        .map(|r| domain_authority(&r.domain, competitors))
        .collect();
    if top.is_empty() {
        return 0.0;
    }
    clamp_score(top.iter().sum::<f64>() / top.len() as f64)
}

/// Share of known features present on the page.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn feature_density_factor(features: &SerpFeatureSet) -> f64 {
    let known = features.known_count();
    if known == 0 {
        return 0.0;
    }
    clamp_score(features.present_count() as f64 / known as f64 * 100.0)
}

/// Share of targetable features present on the page.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn feature_availability_factor(features: &SerpFeatureSet) -> f64 {
    let targetable: Vec<FeatureKind> = FeatureKind::ALL
        .into_iter()
        .filter(|k| k.is_targetable())
        .collect();
    let present = targetable
        .iter()
        .filter(|k| features.is_present(**k))
        .count();
    clamp_score(present as f64 / targetable.len() as f64 * 100.0)
}

/// Step function over the own domain's organic rank.
#[must_use]
pub fn rank_gap_factor(own_rank: Option<u32>) -> f64 {
    match own_rank {
        None => 100.0,
        Some(rank) if rank <= 3 => 20.0,
        Some(rank) if rank <= 10 => 50.0,
        Some(_) => 80.0,
    }
}

/// Share of configured competitors ranking in the top results above the
/// own domain (anywhere in the top results when unranked). 50 with no
/// competitors configured.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn content_gap_factor(
    organic: &[OrganicResult],
    own_rank: Option<u32>,
    competitors: &[String],
) -> f64 {
    if competitors.is_empty() {
        return NO_COMPETITORS_CONTENT_GAP;
    }
    let above_own = |r: &&OrganicResult| own_rank.is_none_or(|own| r.position < own);
    let ahead = competitors
        .iter()
        .filter(|competitor| {
            organic
                .iter()
                .take(TOP_RESULTS)
                .filter(above_own)
                .any(|r| host_matches(&r.domain, competitor))
        })
        .count();
    clamp_score(ahead as f64 / competitors.len() as f64 * 100.0)
}

/// Rank of the first organic result on `own_domain` or a subdomain of it.
#[must_use]
pub fn own_rank(organic: &[OrganicResult], own_domain: Option<&str>) -> Option<u32> {
    let own = own_domain?;
    organic
        .iter()
        .find(|r| host_matches(&r.domain, own))
        .map(|r| r.position)
}

/// Computes every factor for one results page.
#[must_use]
pub fn compute_factors(
    features: &SerpFeatureSet,
    organic: &[OrganicResult],
    total_results: Option<u64>,
    own_rank: Option<u32>,
    competitors: &[String],
) -> ScoreFactors {
    ScoreFactors {
        result_volume: result_volume_factor(total_results),
        top_domain_authority: top_domain_authority_factor(organic, competitors),
        feature_density: feature_density_factor(features),
        rank_gap: rank_gap_factor(own_rank),
        feature_availability: feature_availability_factor(features),
        content_gap: content_gap_factor(organic, own_rank, competitors),
    }
}
