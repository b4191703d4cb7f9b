use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shopcrawl_core::{ExtractedRecord, ProductFilter, RecordStore, StoreStats, StoredProduct};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::DbError;

const PRODUCT_COLUMNS: &str = "id, source_url, product_url, title, price_display, price_amount, \
     image_url, rating, review_count, badges, raw, imported, imported_at, scraped_at";

/// A row from the `scraped_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapedProductRow {
    pub id: i64,
    pub source_url: String,
    pub product_url: String,
    pub title: String,
    pub price_display: String,
    pub price_amount: Option<Decimal>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub badges: Vec<String>,
    pub raw: serde_json::Value,
    pub imported: bool,
    pub imported_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
}

impl TryFrom<ScrapedProductRow> for StoredProduct {
    type Error = DbError;

    fn try_from(row: ScrapedProductRow) -> Result<Self, Self::Error> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_value(row.raw)
            .map_err(|source| DbError::CorruptRaw { id: row.id, source })?;
        Ok(Self {
            id: row.id,
            source_url: row.source_url,
            product_url: row.product_url,
            title: row.title,
            price_display: row.price_display,
            price_amount: row.price_amount,
            image_url: row.image_url,
            rating: row.rating,
            review_count: row.review_count,
            badges: row.badges,
            raw,
            imported: row.imported,
            imported_at: row.imported_at,
            scraped_at: row.scraped_at,
        })
    }
}

/// Postgres-backed [`RecordStore`] over `scraped_products`.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetches a single product by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no row has that id, or
    /// [`DbError::Sqlx`] if the query fails.
    pub async fn get(&self, id: i64) -> Result<StoredProduct, DbError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM scraped_products WHERE id = $1");
        let row = sqlx::query_as::<_, ScrapedProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)?;
        StoredProduct::try_from(row)
    }
}

impl RecordStore for PgRecordStore {
    type Error = DbError;

    /// Inserts or fully replaces the row keyed by the record's product URL.
    ///
    /// The `imported` flag survives a re-scrape; everything else is
    /// overwritten and `scraped_at` is reset to `NOW()`.
    async fn upsert_one(&self, record: &ExtractedRecord, source_url: &str) -> Result<i64, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO scraped_products \
                 (source_url, product_url, title, price_display, price_amount, image_url, \
                  rating, review_count, badges, raw, scraped_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) \
             ON CONFLICT (product_url) DO UPDATE SET \
                 source_url    = EXCLUDED.source_url, \
                 title         = EXCLUDED.title, \
                 price_display = EXCLUDED.price_display, \
                 price_amount  = EXCLUDED.price_amount, \
                 image_url     = EXCLUDED.image_url, \
                 rating        = EXCLUDED.rating, \
                 review_count  = EXCLUDED.review_count, \
                 badges        = EXCLUDED.badges, \
                 raw           = EXCLUDED.raw, \
                 scraped_at    = NOW() \
             RETURNING id",
        )
        .bind(source_url)
        .bind(record.product_url())
        .bind(&record.title)
        .bind(&record.price_display)
        .bind(record.price_amount)
        .bind(record.image_url.as_deref())
        .bind(record.rating)
        .bind(record.review_count)
        .bind(&record.badges)
        .bind(Json(&record.raw))
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id, product_url = record.product_url(), "product upserted");
        Ok(id)
    }

    async fn query(&self, filter: &ProductFilter) -> Result<Vec<StoredProduct>, DbError> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM scraped_products WHERE TRUE"
        ));
        if let Some(source_url) = &filter.source_url {
            builder.push(" AND source_url = ").push_bind(source_url);
        }
        if let Some(imported) = filter.imported {
            builder.push(" AND imported = ").push_bind(imported);
        }
        builder.push(" ORDER BY scraped_at DESC, id DESC");

        let rows = builder
            .build_query_as::<ScrapedProductRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(StoredProduct::try_from).collect()
    }

    async fn mark_imported(&self, ids: &[i64]) -> Result<u64, DbError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE scraped_products \
             SET imported = TRUE, imported_at = NOW() \
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, ids: &[i64]) -> Result<u64, DbError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM scraped_products WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<StoreStats, DbError> {
        let (total_products, total_sources, imported_products, last_scraped) =
            sqlx::query_as::<_, (i64, i64, i64, Option<DateTime<Utc>>)>(
                "SELECT COUNT(*), \
                        COUNT(DISTINCT source_url), \
                        COUNT(*) FILTER (WHERE imported), \
                        MAX(scraped_at) \
                 FROM scraped_products",
            )
            .fetch_one(&self.pool)
            .await?;
        Ok(StoreStats {
            total_products,
            total_sources,
            imported_products,
            last_scraped,
        })
    }
}
