use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One item pulled out of a listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Listing page the record was found on.
    pub source_url: String,
    /// The item's own page; doubles as the dedup key when present.
    pub canonical_url: Option<String>,
    /// Always non-empty; records without a title never leave the extractor.
    pub title: String,
    /// Price text exactly as displayed, e.g. `"1.234,56 €"`.
    pub price_display: String,
    pub price_amount: Option<Decimal>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub badges: Vec<String>,
    /// Every extracted field, keyed by field name. Multi-valued fields are
    /// JSON arrays, misses are `null`.
    pub raw: BTreeMap<String, serde_json::Value>,
}

impl ExtractedRecord {
    /// The natural key used by the record store.
    ///
    /// Falls back to the empty string when the listing exposed no item URL;
    /// every such record shares that key.
    #[must_use]
    pub fn product_url(&self) -> &str {
        self.canonical_url.as_deref().unwrap_or("")
    }

    /// Returns a raw field as a list of strings.
    ///
    /// Arrays are returned element-wise; a plain string is split on commas.
    #[must_use]
    pub fn raw_list(&self, field: &str) -> Vec<String> {
        match self.raw.get(field) {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_owned)
                .collect(),
            Some(serde_json::Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns a raw field as a single string, if it holds one.
    #[must_use]
    pub fn raw_str(&self, field: &str) -> Option<&str> {
        self.raw
            .get(field)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Persisted form of an [`ExtractedRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProduct {
    pub id: i64,
    pub source_url: String,
    /// Dedup key; empty when the record carried no canonical URL.
    pub product_url: String,
    pub title: String,
    pub price_display: String,
    pub price_amount: Option<Decimal>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub badges: Vec<String>,
    pub raw: BTreeMap<String, serde_json::Value>,
    pub imported: bool,
    pub imported_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
}

impl StoredProduct {
    /// Rebuilds the extracted view of this row, e.g. to hand it to the importer.
    #[must_use]
    pub fn to_record(&self) -> ExtractedRecord {
        ExtractedRecord {
            source_url: self.source_url.clone(),
            canonical_url: Some(self.product_url.clone()).filter(|u| !u.is_empty()),
            title: self.title.clone(),
            price_display: self.price_display.clone(),
            price_amount: self.price_amount,
            image_url: self.image_url.clone(),
            rating: self.rating,
            review_count: self.review_count,
            badges: self.badges.clone(),
            raw: self.raw.clone(),
        }
    }
}

/// Filter for [`crate::RecordStore::query`]. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub source_url: Option<String>,
    pub imported: Option<bool>,
}

impl ProductFilter {
    #[must_use]
    pub fn matches(&self, product: &StoredProduct) -> bool {
        self.source_url
            .as_deref()
            .is_none_or(|s| s == product.source_url)
            && self.imported.is_none_or(|i| i == product.imported)
    }
}

/// Aggregate counters over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_products: i64,
    pub total_sources: i64,
    pub imported_products: i64,
    pub last_scraped: Option<DateTime<Utc>>,
}
