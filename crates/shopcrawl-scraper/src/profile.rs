//! Compiled extraction profiles and the built-in generic profile.

use std::collections::BTreeMap;
use std::path::Path;

use shopcrawl_core::{load_profiles, validate_profile, ProfileConfig};

use crate::error::ScraperError;
use crate::query::Query;

/// Field names the record builder understands. Profiles may define others;
/// those only land in [`shopcrawl_core::ExtractedRecord::raw`].
pub mod fields {
    pub const TITLE: &str = "title";
    pub const URL: &str = "url";
    pub const PRICE: &str = "price";
    pub const IMAGE: &str = "image";
    pub const RATING: &str = "rating";
    pub const REVIEW_COUNT: &str = "review_count";
    pub const BADGES: &str = "badges";
    pub const DESCRIPTION: &str = "description";
    pub const CATEGORIES: &str = "categories";
    pub const GALLERY: &str = "gallery";

    /// Fields that collect every match of their winning query.
    pub const MULTI_VALUED: [&str; 3] = [BADGES, CATEGORIES, GALLERY];
}

pub const GENERIC_PROFILE_NAME: &str = "generic";

/// Broad commerce-listing fallbacks, most specific first.
const GENERIC_RECORD_PATTERNS: &[&str] = &[
    "ul.products > li.product",
    "[itemtype$=\"schema.org/Product\"]",
    "[data-product-id]",
    ".product-card",
    ".product-item",
    ".grid-product",
    "article.product",
    "li.product",
    ".products > .product",
];

const GENERIC_FIELDS: &[(&str, &[&str])] = &[
    (
        fields::TITLE,
        &[
            "[itemprop=\"name\"]",
            ".woocommerce-loop-product__title",
            ".product-title",
            ".product-name",
            ".product-card__title",
            "h2 a",
            "h2",
            "h3",
            "a@title",
            "img@alt",
        ],
    ),
    (
        fields::URL,
        &[
            "a.woocommerce-LoopProduct-link@href",
            "[itemprop=\"url\"]@href",
            "a.product-link@href",
            "a.product-card__link@href",
            "h2 a@href",
            "h3 a@href",
            "a@href",
            "@href",
        ],
    ),
    (
        fields::PRICE,
        &[
            "[itemprop=\"price\"]@content",
            ".price ins .amount",
            ".price .amount",
            ".price",
            ".product-price",
            "[data-price]@data-price",
        ],
    ),
    (
        fields::IMAGE,
        &[
            "img@data-src",
            "img@data-lazy-src",
            "img@data-original",
            "img@src",
        ],
    ),
    (
        fields::RATING,
        &[
            "[itemprop=\"ratingValue\"]@content",
            "[itemprop=\"ratingValue\"]",
            ".star-rating@aria-label",
            ".star-rating .rating",
            "[data-rating]@data-rating",
            ".rating",
        ],
    ),
    (
        fields::REVIEW_COUNT,
        &[
            "[itemprop=\"reviewCount\"]@content",
            "[itemprop=\"reviewCount\"]",
            ".review-count",
            ".reviews-count",
            ".rating-count",
        ],
    ),
    (
        fields::BADGES,
        &[".onsale", ".product-badge", ".badge", ".label"],
    ),
    (
        fields::DESCRIPTION,
        &[
            "[itemprop=\"description\"]",
            ".product-short-description",
            ".description",
        ],
    ),
    (
        fields::CATEGORIES,
        &[
            ".posted_in a",
            ".product-category",
            "[data-category]@data-category",
        ],
    ),
    (
        fields::GALLERY,
        &["[data-gallery-image]@data-gallery-image", ".gallery img@src"],
    ),
];

/// A profile with every query compiled, ready to run against documents.
#[derive(Debug, Clone)]
pub struct ExtractionProfile {
    name: String,
    record_patterns: Vec<Query>,
    fields: BTreeMap<String, Vec<Query>>,
}

impl ExtractionProfile {
    /// Validates and compiles `config`. Blank query strings are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Profile`] when the profile breaks a structural
    /// rule, or [`ScraperError::InvalidQuery`] for the first selector that
    /// does not compile.
    pub fn compile(config: &ProfileConfig) -> Result<Self, ScraperError> {
        validate_profile(config)?;

        let compile_all = |queries: &[String]| -> Result<Vec<Query>, ScraperError> {
            queries
                .iter()
                .filter(|q| !q.trim().is_empty())
                .map(|q| Query::parse(q))
                .collect()
        };

        let record_patterns = compile_all(&config.record_patterns)?;
        let fields = config
            .fields
            .iter()
            .map(|(name, queries)| Ok((name.clone(), compile_all(queries)?)))
            .collect::<Result<BTreeMap<_, _>, ScraperError>>()?;

        Ok(Self {
            name: config.name.clone(),
            record_patterns,
            fields,
        })
    }

    /// The built-in profile used when no profile file is configured.
    ///
    /// # Panics
    ///
    /// Never in practice: the built-in selectors are constants covered by
    /// tests.
    #[must_use]
    pub fn generic() -> Self {
        Self::compile(&generic_profile_config()).expect("built-in generic profile is valid")
    }

    /// Loads `name` from a YAML profiles file, or the file's first profile
    /// when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Profile`] if the file cannot be loaded or has
    /// no matching profile, or a compile error from [`Self::compile`].
    pub fn from_file(path: &Path, name: Option<&str>) -> Result<Self, ScraperError> {
        let file = load_profiles(path)?;
        let config = match name {
            Some(name) => file.find(name),
            None => file.profiles.first(),
        }
        .ok_or_else(|| {
            shopcrawl_core::ConfigError::Validation(format!(
                "profile '{}' not found in {}",
                name.unwrap_or("<first>"),
                path.display()
            ))
        })?;
        Self::compile(config)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn record_patterns(&self) -> &[Query] {
        &self.record_patterns
    }

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Vec<Query>> {
        &self.fields
    }
}

/// Uncompiled form of the generic profile.
#[must_use]
pub fn generic_profile_config() -> ProfileConfig {
    let to_strings = |qs: &[&str]| qs.iter().map(|q| (*q).to_owned()).collect::<Vec<_>>();
    ProfileConfig {
        name: GENERIC_PROFILE_NAME.to_owned(),
        record_patterns: to_strings(GENERIC_RECORD_PATTERNS),
        fields: GENERIC_FIELDS
            .iter()
            .map(|(name, queries)| ((*name).to_owned(), to_strings(queries)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_profile_compiles() {
        let profile = ExtractionProfile::generic();
        assert_eq!(profile.name(), GENERIC_PROFILE_NAME);
        assert_eq!(profile.record_patterns().len(), GENERIC_RECORD_PATTERNS.len());
        assert!(profile.fields().contains_key(fields::TITLE));
        assert!(profile.fields().contains_key(fields::PRICE));
    }

    #[test]
    fn compile_rejects_invalid_selector() {
        let mut config = generic_profile_config();
        config.record_patterns.push("li[[broken".to_owned());
        let err = ExtractionProfile::compile(&config).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidQuery { .. }));
    }

    #[test]
    fn compile_rejects_profile_without_title() {
        let mut config = generic_profile_config();
        config.fields.remove(fields::TITLE);
        let err = ExtractionProfile::compile(&config).unwrap_err();
        assert!(matches!(err, ScraperError::Profile(_)));
    }

    #[test]
    fn sample_profiles_file_compiles() {
        let file = shopcrawl_core::parse_profiles(include_str!("../../../config/profiles.yaml"))
            .expect("sample profiles parse");
        assert!(file.find("woocommerce").is_some());
        for config in &file.profiles {
            let profile = ExtractionProfile::compile(config)
                .unwrap_or_else(|e| panic!("profile {} failed: {e}", config.name));
            assert!(!profile.record_patterns().is_empty());
        }
    }

    #[test]
    fn compile_drops_blank_queries() {
        let config = ProfileConfig {
            name: "sparse".to_owned(),
            record_patterns: vec![String::new(), "li.item".to_owned()],
            fields: [("title".to_owned(), vec!["  ".to_owned(), "h2".to_owned()])]
                .into_iter()
                .collect(),
        };
        let profile = ExtractionProfile::compile(&config).unwrap();
        assert_eq!(profile.record_patterns().len(), 1);
        assert_eq!(profile.fields()["title"].len(), 1);
    }
}
