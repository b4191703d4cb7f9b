//! Maps extracted records onto catalog entities.

use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopcrawl_core::{
    AppConfig, Catalog, ExtractedRecord, MediaAsset, NewCatalogProduct, ProductFilter,
    RecordStore,
};
use shopcrawl_scraper::parse_price;
use shopcrawl_scraper::profile::fields;

use crate::assets::AssetDownloader;
use crate::error::ImportError;

const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub max_concurrent_downloads: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
        }
    }
}

impl ImportOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_concurrent_downloads: config.import_max_concurrent_downloads.max(1),
        }
    }
}

/// Per-batch counters. Every input record lands in exactly one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub success: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Created(i64),
    Skipped,
    Failed,
}

pub struct ImportMapper<C> {
    catalog: C,
    downloader: AssetDownloader,
    options: ImportOptions,
}

impl<C: Catalog> ImportMapper<C> {
    #[must_use]
    pub fn new(catalog: C, downloader: AssetDownloader, options: ImportOptions) -> Self {
        Self {
            catalog,
            downloader,
            options,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Imports every record, isolating failures per record.
    pub async fn import_all(&self, records: &[ExtractedRecord]) -> ImportSummary {
        summarize(&self.import_batch(records).await)
    }

    /// Imports the stored products matching `filter` and flags the ones that
    /// were created as imported.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Store`] if the store cannot be queried, and
    /// [`ImportError::MarkImported`], carrying the batch summary, if catalog
    /// products were created but their rows could not be flagged.
    /// Per-record catalog failures are counted, not returned.
    pub async fn import_from_store<S: RecordStore>(
        &self,
        store: &S,
        filter: &ProductFilter,
    ) -> Result<ImportSummary, ImportError> {
        let products = store
            .query(filter)
            .await
            .map_err(|e| ImportError::Store(Box::new(e)))?;
        let records: Vec<ExtractedRecord> = products.iter().map(|p| p.to_record()).collect();

        let outcomes = self.import_batch(&records).await;
        let summary = summarize(&outcomes);
        let imported: Vec<i64> = products
            .iter()
            .zip(&outcomes)
            .filter(|(_, outcome)| matches!(outcome, Outcome::Created(_)))
            .map(|(product, _)| product.id)
            .collect();

        if !imported.is_empty() {
            match store.mark_imported(&imported).await {
                Ok(marked) => tracing::info!(marked, "stored products flagged as imported"),
                Err(e) => {
                    tracing::error!(
                        ids = ?imported,
                        error = %e,
                        "catalog products created but stored rows not flagged as imported"
                    );
                    return Err(ImportError::MarkImported {
                        summary,
                        ids: imported,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(summary)
    }

    async fn import_batch(&self, records: &[ExtractedRecord]) -> Vec<Outcome> {
        let mut outcomes: Vec<Option<Outcome>> = vec![None; records.len()];

        // Name dedup against the catalog and within the batch.
        let mut seen: HashSet<&str> = HashSet::new();
        let mut candidates: Vec<usize> = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let name = record.title.trim();
            if !seen.insert(name) {
                tracing::info!(name, "duplicate name in batch, skipping");
                outcomes[index] = Some(Outcome::Skipped);
                continue;
            }
            match self.catalog.find_product_by_name(name).await {
                Ok(Some(existing)) => {
                    tracing::info!(name, existing, "product already in catalog, skipping");
                    outcomes[index] = Some(Outcome::Skipped);
                }
                Ok(None) => candidates.push(index),
                Err(e) => {
                    tracing::error!(name, error = %e, "catalog lookup failed");
                    outcomes[index] = Some(Outcome::Failed);
                }
            }
        }

        // Up to `max_concurrent_downloads` records download ahead of the
        // creation loop; each record's bytes are dropped once it is created.
        let downloader = &self.downloader;
        let mut downloads = stream::iter(candidates.into_iter().map(|index| async move {
            (index, download_images(downloader, &records[index]).await)
        }))
        .buffered(self.options.max_concurrent_downloads.max(1));

        while let Some((index, assets)) = downloads.next().await {
            let record = &records[index];
            outcomes[index] = Some(match self.create_entity(record, &assets).await {
                Ok(id) => {
                    tracing::info!(name = %record.title, id, "catalog product created");
                    Outcome::Created(id)
                }
                Err(e) => {
                    tracing::error!(name = %record.title, error = %e, "import failed");
                    Outcome::Failed
                }
            });
        }

        outcomes
            .into_iter()
            .map(|o| o.unwrap_or(Outcome::Failed))
            .collect()
    }

    async fn create_entity(
        &self,
        record: &ExtractedRecord,
        assets: &HashMap<String, MediaAsset>,
    ) -> Result<i64, ImportError> {
        let name = record.title.trim();

        let image_id = match record.image_url.as_ref().and_then(|url| assets.get(url)) {
            Some(asset) => Some(
                self.catalog
                    .store_media(asset)
                    .await
                    .map_err(|e| ImportError::catalog(name, e))?,
            ),
            None => None,
        };

        let mut gallery_ids = Vec::new();
        for url in record.raw_list(fields::GALLERY) {
            if record.image_url.as_deref() == Some(url.as_str()) {
                continue;
            }
            let Some(asset) = assets.get(&url) else {
                continue;
            };
            match self.catalog.store_media(asset).await {
                Ok(id) => gallery_ids.push(id),
                Err(e) => {
                    tracing::warn!(name, url = %url, error = %e, "gallery image not stored");
                }
            }
        }

        let mut category_ids = Vec::new();
        for category in category_names(record) {
            let id = self
                .find_or_create_category(&category)
                .await
                .map_err(|e| ImportError::catalog(name, e))?;
            if !category_ids.contains(&id) {
                category_ids.push(id);
            }
        }

        let product = NewCatalogProduct {
            name: name.to_owned(),
            description: describe(record),
            regular_price: regular_price(record),
            image_id,
            gallery_ids,
            category_ids,
            source_url: record.canonical_url.clone(),
        };
        self.catalog
            .create_product(&product)
            .await
            .map_err(|e| ImportError::catalog(name, e))
    }

    async fn find_or_create_category(&self, name: &str) -> Result<i64, C::Error> {
        if let Some(id) = self.catalog.find_category_by_name(name).await? {
            return Ok(id);
        }
        self.catalog.create_category(name).await
    }
}

fn summarize(outcomes: &[Outcome]) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Created(_) => summary.success += 1,
            Outcome::Skipped => summary.skipped += 1,
            Outcome::Failed => summary.errors += 1,
        }
    }
    summary
}

/// Downloads every distinct image of `record`. Failed downloads are logged
/// and left out of the map.
async fn download_images(
    downloader: &AssetDownloader,
    record: &ExtractedRecord,
) -> HashMap<String, MediaAsset> {
    let mut assets = HashMap::new();
    for url in image_urls(record) {
        match downloader.download(&url).await {
            Ok(asset) => {
                assets.insert(url, asset);
            }
            Err(e) => {
                tracing::warn!(
                    url = %url,
                    error = %e,
                    "image download failed, continuing without it"
                );
            }
        }
    }
    assets
}

/// Primary image first, then gallery images.
fn image_urls(record: &ExtractedRecord) -> Vec<String> {
    let mut urls: Vec<String> = record.image_url.iter().cloned().collect();
    for url in record.raw_list(fields::GALLERY) {
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

fn category_names(record: &ExtractedRecord) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in record.raw_list(fields::CATEGORIES) {
        let name = name.trim().to_owned();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn regular_price(record: &ExtractedRecord) -> Option<Decimal> {
    record
        .price_amount
        .or_else(|| parse_price(&record.price_display))
}

/// The record's own description, else one assembled from rating, review
/// count and badges.
fn describe(record: &ExtractedRecord) -> String {
    if let Some(description) = record.raw_str(fields::DESCRIPTION) {
        return description.trim().to_owned();
    }

    let mut parts: Vec<String> = Vec::new();
    match (record.rating, record.review_count) {
        (Some(rating), Some(count)) => {
            parts.push(format!("Rated {rating} out of 5 from {count} reviews."));
        }
        (Some(rating), None) => parts.push(format!("Rated {rating} out of 5.")),
        (None, Some(count)) => parts.push(format!("{count} reviews.")),
        (None, None) => {}
    }
    if !record.badges.is_empty() {
        parts.push(format!("{}.", record.badges.join(", ")));
    }
    parts.join(" ")
}
