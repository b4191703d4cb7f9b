//! Target commerce catalog collaborator used by the importer.

use std::future::Future;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog entity about to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCatalogProduct {
    pub name: String,
    pub description: String,
    pub regular_price: Option<Decimal>,
    pub image_id: Option<i64>,
    pub gallery_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
    /// Page the product was crawled from, kept for traceability.
    pub source_url: Option<String>,
}

/// A downloaded binary ready to be stored as a media asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub file_name: String,
    pub content_type: String,
    pub source_url: String,
    pub bytes: Vec<u8>,
}

pub trait Catalog: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Exact, case-sensitive lookup by display name.
    fn find_product_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send;

    fn create_product(
        &self,
        product: &NewCatalogProduct,
    ) -> impl Future<Output = Result<i64, Self::Error>> + Send;

    fn find_category_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send;

    fn create_category(&self, name: &str)
        -> impl Future<Output = Result<i64, Self::Error>> + Send;

    fn store_media(
        &self,
        asset: &MediaAsset,
    ) -> impl Future<Output = Result<i64, Self::Error>> + Send;
}
