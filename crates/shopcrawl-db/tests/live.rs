//! Live integration tests for shopcrawl-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/shopcrawl-db/`), so `"../../migrations"` resolves to the
//! workspace migration directory.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use shopcrawl_core::{
    Catalog, ExtractedRecord, MediaAsset, NewCatalogProduct, ProductFilter, RecordStore,
};
use shopcrawl_db::{PgCatalog, PgRecordStore};

const SOURCE: &str = "https://shop.example/catalog/";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_record(canonical: Option<&str>, title: &str) -> ExtractedRecord {
    let mut raw = BTreeMap::new();
    raw.insert("title".to_string(), serde_json::json!(title));
    raw.insert(
        "badges".to_string(),
        serde_json::json!(["Sale", "New"]),
    );
    ExtractedRecord {
        source_url: format!("{SOURCE}?page=1"),
        canonical_url: canonical.map(str::to_owned),
        title: title.to_string(),
        price_display: "$1,299.00".to_string(),
        price_amount: Some(Decimal::new(129_900, 2)),
        image_url: Some("https://cdn.shop.example/a.jpg".to_string()),
        rating: Some(4.5),
        review_count: Some(12),
        badges: vec!["Sale".to_string(), "New".to_string()],
        raw,
    }
}

// ---------------------------------------------------------------------------
// Section 1: Record store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_round_trips_every_field(pool: sqlx::PgPool) {
    let store = PgRecordStore::new(pool);
    let record = make_record(Some("https://shop.example/p/oak"), "Oak Table");
    let id = store
        .upsert_one(&record, SOURCE)
        .await
        .expect("upsert_one failed");

    let stored = store.get(id).await.expect("get failed");
    assert_eq!(stored.source_url, SOURCE);
    assert_eq!(stored.product_url, "https://shop.example/p/oak");
    assert_eq!(stored.price_amount, Some(Decimal::new(129_900, 2)));
    assert_eq!(stored.badges, vec!["Sale", "New"]);
    assert_eq!(stored.raw, record.raw);
    assert_eq!(stored.rating, Some(4.5));
    assert!(!stored.imported);
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_same_url_updates_in_place(pool: sqlx::PgPool) {
    let store = PgRecordStore::new(pool);
    let first = store
        .upsert_one(&make_record(Some("https://shop.example/p/oak"), "Oak"), SOURCE)
        .await
        .expect("first upsert failed");
    let before = store.get(first).await.expect("get failed").scraped_at;

    let mut changed = make_record(Some("https://shop.example/p/oak"), "Oak Table v2");
    changed.price_amount = None;
    let second = store
        .upsert_one(&changed, SOURCE)
        .await
        .expect("second upsert failed");

    assert_eq!(first, second);
    let stored = store.get(first).await.expect("get failed");
    assert_eq!(stored.title, "Oak Table v2");
    assert_eq!(stored.price_amount, None);
    assert!(stored.scraped_at >= before);
    assert_eq!(store.stats().await.expect("stats").total_products, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn records_without_url_collapse_to_one_row(pool: sqlx::PgPool) {
    let store = PgRecordStore::new(pool);
    let saved = store
        .upsert(&[make_record(None, "First"), make_record(None, "Second")], SOURCE)
        .await;
    assert_eq!(saved, 2);

    let rows = store.query(&ProductFilter::default()).await.expect("query failed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Second");
}

#[sqlx::test(migrations = "../../migrations")]
async fn batch_upsert_isolates_constraint_failures(pool: sqlx::PgPool) {
    let store = PgRecordStore::new(pool);
    let mut batch = vec![
        make_record(Some("https://shop.example/p/1"), "One"),
        make_record(Some("https://shop.example/p/2"), "Two"),
        make_record(Some("https://shop.example/p/3"), "Three"),
    ];
    // Violates the non-empty title check.
    batch[1].title = String::new();

    let saved = store.upsert(&batch, SOURCE).await;
    assert_eq!(saved, 2);
    assert_eq!(store.stats().await.expect("stats").total_products, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_upserts_of_one_url_leave_one_row(pool: sqlx::PgPool) {
    let store = PgRecordStore::new(pool);
    let a = make_record(Some("https://shop.example/p/race"), "From crawl A");
    let b = make_record(Some("https://shop.example/p/race"), "From crawl B");

    let (ra, rb) = tokio::join!(store.upsert_one(&a, SOURCE), store.upsert_one(&b, SOURCE));
    assert_eq!(ra.expect("crawl A upsert"), rb.expect("crawl B upsert"));

    let rows = store.query(&ProductFilter::default()).await.expect("query failed");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].title == "From crawl A" || rows[0].title == "From crawl B");
}

#[sqlx::test(migrations = "../../migrations")]
async fn query_filters_and_orders_newest_first(pool: sqlx::PgPool) {
    let store = PgRecordStore::new(pool);
    for i in 1..=3 {
        store
            .upsert_one(
                &make_record(Some(&format!("https://shop.example/p/{i}")), &format!("P{i}")),
                SOURCE,
            )
            .await
            .expect("upsert failed");
    }
    store
        .upsert_one(
            &make_record(Some("https://other.example/p/x"), "Other"),
            "https://other.example/",
        )
        .await
        .expect("upsert other failed");

    let all = store.query(&ProductFilter::default()).await.expect("query failed");
    let titles: Vec<&str> = all.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Other", "P3", "P2", "P1"]);

    let shop = store
        .query(&ProductFilter {
            source_url: Some(SOURCE.to_string()),
            imported: None,
        })
        .await
        .expect("filtered query failed");
    assert_eq!(shop.len(), 3);
    assert!(shop.iter().all(|p| p.source_url == SOURCE));
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_imported_delete_and_stats(pool: sqlx::PgPool) {
    let store = PgRecordStore::new(pool);
    let a = store
        .upsert_one(&make_record(Some("https://shop.example/p/a"), "A"), SOURCE)
        .await
        .expect("upsert a");
    let b = store
        .upsert_one(&make_record(Some("https://shop.example/p/b"), "B"), SOURCE)
        .await
        .expect("upsert b");

    assert_eq!(store.mark_imported(&[a, 424_242]).await.expect("mark"), 1);
    assert_eq!(store.mark_imported(&[]).await.expect("mark none"), 0);

    let imported = store
        .query(&ProductFilter {
            source_url: None,
            imported: Some(true),
        })
        .await
        .expect("query imported");
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].id, a);
    assert!(imported[0].imported_at.is_some());

    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.total_products, 2);
    assert_eq!(stats.total_sources, 1);
    assert_eq!(stats.imported_products, 1);
    assert!(stats.last_scraped.is_some());

    assert_eq!(store.delete(&[b]).await.expect("delete"), 1);
    assert_eq!(store.delete(&[b]).await.expect("delete again"), 0);
    assert_eq!(store.stats().await.expect("stats").total_products, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn get_missing_product_is_not_found(pool: sqlx::PgPool) {
    let store = PgRecordStore::new(pool);
    let err = store.get(1).await.expect_err("expected NotFound");
    assert!(matches!(err, shopcrawl_db::DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Section 2: Catalog
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn catalog_creates_product_with_media_and_categories(pool: sqlx::PgPool) {
    let catalog = PgCatalog::new(pool.clone());

    let image = catalog
        .store_media(&MediaAsset {
            file_name: "a.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            source_url: "https://cdn.shop.example/a.jpg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        })
        .await
        .expect("store_media failed");
    let furniture = catalog
        .create_category("Furniture")
        .await
        .expect("create_category failed");
    assert_eq!(
        catalog
            .create_category("Furniture")
            .await
            .expect("second create_category failed"),
        furniture
    );
    assert_eq!(
        catalog
            .find_category_by_name("Furniture")
            .await
            .expect("find_category failed"),
        Some(furniture)
    );
    assert_eq!(
        catalog
            .find_category_by_name("furniture")
            .await
            .expect("find_category failed"),
        None
    );

    let id = catalog
        .create_product(&NewCatalogProduct {
            name: "Oak Table".to_string(),
            description: "Solid oak.".to_string(),
            regular_price: Some(Decimal::new(129_900, 2)),
            image_id: Some(image),
            gallery_ids: vec![image],
            category_ids: vec![furniture],
            source_url: Some("https://shop.example/p/oak".to_string()),
        })
        .await
        .expect("create_product failed");

    assert_eq!(
        catalog
            .find_product_by_name("Oak Table")
            .await
            .expect("find_product failed"),
        Some(id)
    );
    assert_eq!(
        catalog
            .find_product_by_name("oak table")
            .await
            .expect("find_product failed"),
        None
    );

    let links: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM catalog_product_categories WHERE product_id = $1",
    )
    .bind(id)
    .fetch_one(&pool)
    .await
    .expect("count category links");
    assert_eq!(links, 1);
}
