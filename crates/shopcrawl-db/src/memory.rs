//! In-process [`RecordStore`] for dry runs and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use shopcrawl_core::{ExtractedRecord, ProductFilter, RecordStore, StoreStats, StoredProduct};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("record for {product_url:?} has an empty title")]
    EmptyTitle { product_url: String },
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    rows: BTreeMap<i64, StoredProduct>,
    by_url: HashMap<String, i64>,
}

/// Mirrors [`crate::PgRecordStore`]: same keying, same ordering, same
/// constraint on empty titles.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    state: Mutex<State>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryRecordStore {
    type Error = MemoryStoreError;

    async fn upsert_one(
        &self,
        record: &ExtractedRecord,
        source_url: &str,
    ) -> Result<i64, MemoryStoreError> {
        if record.title.trim().is_empty() {
            return Err(MemoryStoreError::EmptyTitle {
                product_url: record.product_url().to_owned(),
            });
        }

        let mut state = self.lock();
        let now = Utc::now();
        let key = record.product_url().to_owned();

        let existing = state.by_url.get(&key).copied();
        let id = if let Some(id) = existing {
            id
        } else {
            state.next_id += 1;
            let id = state.next_id;
            state.by_url.insert(key.clone(), id);
            id
        };
        let (imported, imported_at) = state
            .rows
            .get(&id)
            .map_or((false, None), |row| (row.imported, row.imported_at));

        state.rows.insert(
            id,
            StoredProduct {
                id,
                source_url: source_url.to_owned(),
                product_url: key,
                title: record.title.clone(),
                price_display: record.price_display.clone(),
                price_amount: record.price_amount,
                image_url: record.image_url.clone(),
                rating: record.rating,
                review_count: record.review_count,
                badges: record.badges.clone(),
                raw: record.raw.clone(),
                imported,
                imported_at,
                scraped_at: now,
            },
        );
        Ok(id)
    }

    async fn query(&self, filter: &ProductFilter) -> Result<Vec<StoredProduct>, MemoryStoreError> {
        let state = self.lock();
        let mut rows: Vec<StoredProduct> = state
            .rows
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn mark_imported(&self, ids: &[i64]) -> Result<u64, MemoryStoreError> {
        let mut state = self.lock();
        let now = Utc::now();
        let mut touched = 0u64;
        for id in ids {
            if let Some(row) = state.rows.get_mut(id) {
                row.imported = true;
                row.imported_at = Some(now);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn delete(&self, ids: &[i64]) -> Result<u64, MemoryStoreError> {
        let mut state = self.lock();
        let mut removed = 0u64;
        for id in ids {
            if let Some(row) = state.rows.remove(id) {
                state.by_url.remove(&row.product_url);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn stats(&self) -> Result<StoreStats, MemoryStoreError> {
        let state = self.lock();
        let mut sources: Vec<&str> = state.rows.values().map(|r| r.source_url.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        Ok(StoreStats {
            total_products: i64::try_from(state.rows.len()).unwrap_or(i64::MAX),
            total_sources: i64::try_from(sources.len()).unwrap_or(i64::MAX),
            imported_products: i64::try_from(state.rows.values().filter(|r| r.imported).count())
                .unwrap_or(i64::MAX),
            last_scraped: state.rows.values().map(|r| r.scraped_at).max(),
        })
    }
}
