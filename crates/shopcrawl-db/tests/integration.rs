//! Offline tests for shopcrawl-db pool configuration and the in-memory store.
//! These tests do not require a live database connection.

use std::collections::BTreeMap;

use shopcrawl_core::{AppConfig, Environment, ExtractedRecord, ProductFilter, RecordStore};
use shopcrawl_db::{MemoryRecordStore, PoolConfig};

const SOURCE: &str = "https://shop.example/catalog/";

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        request_timeout_secs: 30,
        user_agent: "ua".to_string(),
        crawl_base_url: None,
        crawl_start_page: 1,
        crawl_max_pages: 5,
        inter_request_delay_ms: 0,
        page_param: "page".to_string(),
        profiles_path: None,
        serp_search_url: "https://www.google.com/search".to_string(),
        serp_own_domain: None,
        serp_competitors: vec![],
        import_max_concurrent_downloads: 4,
    }
}

fn record(canonical: Option<&str>, title: &str) -> ExtractedRecord {
    ExtractedRecord {
        source_url: format!("{SOURCE}?page=1"),
        canonical_url: canonical.map(str::to_owned),
        title: title.to_string(),
        price_display: "$10.00".to_string(),
        price_amount: None,
        image_url: None,
        rating: None,
        review_count: None,
        badges: vec![],
        raw: BTreeMap::new(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[tokio::test]
async fn upsert_is_idempotent_on_product_url() {
    let store = MemoryRecordStore::new();
    let first = store
        .upsert_one(&record(Some("https://shop.example/p/a"), "A"), SOURCE)
        .await
        .expect("first upsert");
    let second = store
        .upsert_one(&record(Some("https://shop.example/p/a"), "A v2"), SOURCE)
        .await
        .expect("second upsert");

    assert_eq!(first, second);
    assert_eq!(store.len(), 1);
    let rows = store.query(&ProductFilter::default()).await.expect("query");
    assert_eq!(rows[0].title, "A v2");
}

#[tokio::test]
async fn records_without_url_share_the_empty_key() {
    let store = MemoryRecordStore::new();
    let saved = store
        .upsert(&[record(None, "First"), record(None, "Second")], SOURCE)
        .await;
    assert_eq!(saved, 2);
    assert_eq!(store.len(), 1);
    let rows = store.query(&ProductFilter::default()).await.expect("query");
    assert_eq!(rows[0].title, "Second");
    assert_eq!(rows[0].product_url, "");
}

#[tokio::test]
async fn batch_upsert_skips_failing_records() {
    let store = MemoryRecordStore::new();
    let batch = vec![
        record(Some("https://shop.example/p/1"), "One"),
        record(Some("https://shop.example/p/2"), "  "),
        record(Some("https://shop.example/p/3"), "Three"),
    ];
    let saved = store.upsert(&batch, SOURCE).await;
    assert_eq!(saved, 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn query_orders_newest_first_and_filters() {
    let store = MemoryRecordStore::new();
    for i in 1..=3 {
        store
            .upsert_one(
                &record(Some(&format!("https://shop.example/p/{i}")), &format!("P{i}")),
                SOURCE,
            )
            .await
            .expect("upsert");
    }
    store
        .upsert_one(
            &record(Some("https://other.example/p/9"), "Other"),
            "https://other.example/",
        )
        .await
        .expect("upsert other");

    let all = store.query(&ProductFilter::default()).await.expect("query");
    let titles: Vec<&str> = all.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Other", "P3", "P2", "P1"]);

    let only_shop = store
        .query(&ProductFilter {
            source_url: Some(SOURCE.to_string()),
            imported: None,
        })
        .await
        .expect("query by source");
    assert_eq!(only_shop.len(), 3);
}

#[tokio::test]
async fn mark_imported_and_delete_report_touched_rows() {
    let store = MemoryRecordStore::new();
    let a = store
        .upsert_one(&record(Some("https://shop.example/p/a"), "A"), SOURCE)
        .await
        .expect("upsert a");
    let b = store
        .upsert_one(&record(Some("https://shop.example/p/b"), "B"), SOURCE)
        .await
        .expect("upsert b");

    assert_eq!(store.mark_imported(&[a, 999]).await.expect("mark"), 1);
    let pending = store
        .query(&ProductFilter {
            source_url: None,
            imported: Some(false),
        })
        .await
        .expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, b);

    // A re-scrape keeps the imported flag.
    store
        .upsert_one(&record(Some("https://shop.example/p/a"), "A again"), SOURCE)
        .await
        .expect("re-upsert a");
    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.imported_products, 1);

    assert_eq!(store.delete(&[a, b, a]).await.expect("delete"), 2);
    assert!(store.is_empty());
}

#[tokio::test]
async fn stats_count_sources_and_latest_scrape() {
    let store = MemoryRecordStore::new();
    let empty = store.stats().await.expect("empty stats");
    assert_eq!(empty.total_products, 0);
    assert!(empty.last_scraped.is_none());

    store
        .upsert_one(&record(Some("https://shop.example/p/a"), "A"), SOURCE)
        .await
        .expect("upsert a");
    store
        .upsert_one(&record(Some("https://shop.example/p/b"), "B"), SOURCE)
        .await
        .expect("upsert b");
    store
        .upsert_one(
            &record(Some("https://other.example/p/c"), "C"),
            "https://other.example/",
        )
        .await
        .expect("upsert c");

    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.total_products, 3);
    assert_eq!(stats.total_sources, 2);
    assert_eq!(stats.imported_products, 0);
    assert!(stats.last_scraped.is_some());
}
