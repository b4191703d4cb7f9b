//! Postgres-backed commerce catalog.

use shopcrawl_core::{Catalog, MediaAsset, NewCatalogProduct};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Catalog for PgCatalog {
    type Error = DbError;

    async fn find_product_by_name(&self, name: &str) -> Result<Option<i64>, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM catalog_products WHERE name = $1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    /// Creates the product together with its gallery and category links in
    /// one transaction.
    async fn create_product(&self, product: &NewCatalogProduct) -> Result<i64, DbError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO catalog_products (name, description, regular_price, image_id, source_url) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.regular_price)
        .bind(product.image_id)
        .bind(product.source_url.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        for (position, media_id) in (0_i32..).zip(&product.gallery_ids) {
            sqlx::query(
                "INSERT INTO catalog_product_gallery (product_id, media_id, position) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (product_id, media_id) DO NOTHING",
            )
            .bind(id)
            .bind(media_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        if !product.category_ids.is_empty() {
            sqlx::query(
                "INSERT INTO catalog_product_categories (product_id, category_id) \
                 SELECT $1, UNNEST($2::BIGINT[]) \
                 ON CONFLICT (product_id, category_id) DO NOTHING",
            )
            .bind(id)
            .bind(&product.category_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(id, name = %product.name, "catalog product created");
        Ok(id)
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<i64>, DbError> {
        let id =
            sqlx::query_scalar::<_, i64>("SELECT id FROM catalog_categories WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id)
    }

    /// Idempotent: a concurrent creator of the same name yields the same id.
    async fn create_category(&self, name: &str) -> Result<i64, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO catalog_categories (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn store_media(&self, asset: &MediaAsset) -> Result<i64, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO catalog_media (file_name, content_type, source_url, bytes) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(&asset.file_name)
        .bind(&asset.content_type)
        .bind(&asset.source_url)
        .bind(&asset.bytes)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}
