//! Keyword-level SERP analysis: fetch, detect, rank, score, recommend.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use shopcrawl_core::AppConfig;
use shopcrawl_scraper::{Document, PageSource};

use crate::error::SerpError;
use crate::features::{position_features, FeatureDetector, SerpFeatureSet};
use crate::organic::{extract_organic_nodes, parse_total_results, OrganicResult};
use crate::recommend::{recommendations, RecommendationInput};
use crate::score::{compute_factors, difficulty_score, opportunity_score, own_rank, ScoreFactors};

pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search";

/// Construction-time inputs of a [`SerpAnalyzer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerpConfig {
    search_url: String,
    own_domain: Option<String>,
    competitors: Vec<String>,
    result_count: Option<u32>,
}

impl SerpConfig {
    /// # Errors
    ///
    /// Returns [`SerpError::InvalidSearchUrl`] unless `search_url` is an
    /// absolute `http(s)` URL.
    pub fn new(search_url: &str) -> Result<Self, SerpError> {
        let trimmed = search_url.trim();
        let url = Url::parse(trimmed).map_err(|e| SerpError::InvalidSearchUrl {
            url: search_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SerpError::InvalidSearchUrl {
                url: search_url.to_owned(),
                reason: format!("unsupported scheme \"{}\"", url.scheme()),
            });
        }
        Ok(Self {
            search_url: trimmed.to_owned(),
            own_domain: None,
            competitors: Vec::new(),
            result_count: None,
        })
    }

    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, SerpError> {
        Ok(Self::new(&config.serp_search_url)?
            .with_own_domain(config.serp_own_domain.as_deref())
            .with_competitors(config.serp_competitors.clone()))
    }

    #[must_use]
    pub fn with_own_domain(mut self, own_domain: Option<&str>) -> Self {
        self.own_domain = own_domain
            .map(|d| {
                let d = d.trim().to_ascii_lowercase();
                d.trim_start_matches("www.").to_owned()
            })
            .filter(|d| !d.is_empty());
        self
    }

    #[must_use]
    pub fn with_competitors(mut self, competitors: Vec<String>) -> Self {
        self.competitors = competitors;
        self
    }

    #[must_use]
    pub fn with_result_count(mut self, result_count: Option<u32>) -> Self {
        self.result_count = result_count;
        self
    }

    #[must_use]
    pub fn own_domain(&self) -> Option<&str> {
        self.own_domain.as_deref()
    }

    #[must_use]
    pub fn competitors(&self) -> &[String] {
        &self.competitors
    }

    /// Results-page URL for `keyword`.
    #[must_use]
    pub fn search_url_for(&self, keyword: &str) -> String {
        let sep = if self.search_url.contains('?') { '&' } else { '?' };
        let encoded = utf8_percent_encode(keyword.trim(), NON_ALPHANUMERIC).to_string();
        let mut url = format!("{}{sep}q={encoded}", self.search_url);
        if let Some(num) = self.result_count {
            url.push_str(&format!("&num={num}"));
        }
        url
    }
}

/// Full analysis of one keyword's results page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerpReport {
    pub keyword: String,
    pub features: SerpFeatureSet,
    pub organic: Vec<OrganicResult>,
    pub total_results: Option<u64>,
    pub own_rank: Option<u32>,
    pub factors: ScoreFactors,
    pub difficulty_score: f64,
    pub opportunity_score: f64,
    pub recommendations: Vec<String>,
}

pub struct SerpAnalyzer<S> {
    source: S,
    config: SerpConfig,
    detector: FeatureDetector,
}

impl<S: PageSource> SerpAnalyzer<S> {
    #[must_use]
    pub fn new(source: S, config: SerpConfig) -> Self {
        Self {
            source,
            config,
            detector: FeatureDetector::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SerpConfig {
        &self.config
    }

    /// Fetches and analyzes the results page for `keyword`.
    ///
    /// # Errors
    ///
    /// Returns [`SerpError::EmptyKeyword`] for a blank keyword and
    /// [`SerpError::Fetch`] when the page cannot be fetched.
    pub async fn analyze_keyword(&self, keyword: &str) -> Result<SerpReport, SerpError> {
        if keyword.trim().is_empty() {
            return Err(SerpError::EmptyKeyword);
        }
        let url = self.config.search_url_for(keyword);
        tracing::info!(keyword, url = %url, "fetching results page");
        let page = self.source.fetch_page(&url).await.inspect_err(|e| {
            tracing::warn!(keyword, url = %url, error = %e, "results page fetch failed");
        })?;
        Ok(self.analyze_html(keyword, &page.body, &url))
    }

    /// Analyzes an already fetched results page. `page_url` resolves
    /// relative result links.
    #[must_use]
    pub fn analyze_html(&self, keyword: &str, html: &str, page_url: &str) -> SerpReport {
        let doc = Document::parse(html);

        let detections = self.detector.detect(&doc);
        let organic_nodes = extract_organic_nodes(&doc, page_url);
        let total_results = parse_total_results(&doc);

        let organic_anchors: Vec<_> = organic_nodes.iter().map(|(node, _)| *node).collect();
        let features = position_features(&doc, detections, &organic_anchors);
        let organic: Vec<OrganicResult> = organic_nodes.into_iter().map(|(_, r)| r).collect();

        self.score(keyword, features, organic, total_results)
    }

    fn score(
        &self,
        keyword: &str,
        features: SerpFeatureSet,
        organic: Vec<OrganicResult>,
        total_results: Option<u64>,
    ) -> SerpReport {
        let own_rank = own_rank(&organic, self.config.own_domain());
        let factors = compute_factors(
            &features,
            &organic,
            total_results,
            own_rank,
            &self.config.competitors,
        );
        let difficulty = difficulty_score(&factors);
        let opportunity = opportunity_score(&factors);
        let recommendations = recommendations(&RecommendationInput {
            features: &features,
            factors: &factors,
            difficulty,
            opportunity,
        });

        tracing::info!(
            keyword,
            features = features.present_count(),
            organic = organic.len(),
            own_rank,
            difficulty,
            opportunity,
            "serp analyzed"
        );

        SerpReport {
            keyword: keyword.trim().to_owned(),
            features,
            organic,
            total_results,
            own_rank,
            factors,
            difficulty_score: difficulty,
            opportunity_score: opportunity,
            recommendations,
        }
    }
}
