//! Persistence seam for extracted records.

use std::future::Future;

use crate::records::{ExtractedRecord, ProductFilter, StoreStats, StoredProduct};

/// Keyed store for crawled products.
///
/// Rows are identified by [`ExtractedRecord::product_url`]. Every write is
/// atomic per record; implementations must tolerate concurrent upserts from
/// independent crawls.
pub trait RecordStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inserts `record`, or replaces every field of the row sharing its
    /// product URL, stamping `scraped_at`. Returns the row id.
    fn upsert_one(
        &self,
        record: &ExtractedRecord,
        source_url: &str,
    ) -> impl Future<Output = Result<i64, Self::Error>> + Send;

    fn query(
        &self,
        filter: &ProductFilter,
    ) -> impl Future<Output = Result<Vec<StoredProduct>, Self::Error>> + Send;

    /// Flags rows as imported. Returns the number of rows touched.
    fn mark_imported(&self, ids: &[i64]) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Returns the number of rows removed.
    fn delete(&self, ids: &[i64]) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    fn stats(&self) -> impl Future<Output = Result<StoreStats, Self::Error>> + Send;

    /// Upserts a batch, isolating failures per record.
    ///
    /// A failing record is logged and skipped; the return value counts only
    /// the records that were written.
    fn upsert(
        &self,
        records: &[ExtractedRecord],
        source_url: &str,
    ) -> impl Future<Output = usize> + Send {
        async move {
            let mut saved = 0usize;
            for record in records {
                match self.upsert_one(record, source_url).await {
                    Ok(_) => saved += 1,
                    Err(e) => {
                        tracing::warn!(
                            product_url = record.product_url(),
                            title = %record.title,
                            error = %e,
                            "record upsert failed, skipping"
                        );
                    }
                }
            }
            saved
        }
    }
}
