//! Commands backed by the Postgres record store and catalog.

use shopcrawl_core::{AppConfig, ProductFilter, RecordStore};
use shopcrawl_db::{PgCatalog, PgRecordStore};
use shopcrawl_import::{AssetDownloader, ImportMapper, ImportOptions};

use crate::print_json;

/// Connects and brings the schema up to date.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool = shopcrawl_db::connect_pool_from_config(config).await?;
    let applied = shopcrawl_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "migrations applied");
    }
    Ok(pool)
}

pub(crate) async fn run_import(
    config: &AppConfig,
    source_url: Option<String>,
) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let store = PgRecordStore::new(pool.clone());
    let downloader = AssetDownloader::new(config.request_timeout_secs, &config.user_agent)?;
    let mapper = ImportMapper::new(
        PgCatalog::new(pool),
        downloader,
        ImportOptions::from_app_config(config),
    );

    let filter = ProductFilter {
        source_url,
        imported: Some(false),
    };
    let summary = match mapper.import_from_store(&store, &filter).await {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(summary) = e.summary() {
                print_json(summary)?;
            }
            return Err(e.into());
        }
    };
    tracing::info!(
        success = summary.success,
        skipped = summary.skipped,
        errors = summary.errors,
        "import finished"
    );
    print_json(&summary)
}

pub(crate) async fn run_stats(config: &AppConfig) -> anyhow::Result<()> {
    let store = PgRecordStore::new(connect(config).await?);
    print_json(&store.stats().await?)
}

pub(crate) async fn run_products(
    config: &AppConfig,
    source_url: Option<String>,
    imported: Option<bool>,
) -> anyhow::Result<()> {
    let store = PgRecordStore::new(connect(config).await?);
    let products = store
        .query(&ProductFilter {
            source_url,
            imported,
        })
        .await?;
    print_json(&products)
}

pub(crate) async fn run_db_ping(config: &AppConfig) -> anyhow::Result<()> {
    let pool = shopcrawl_db::connect_pool_from_config(config).await?;
    shopcrawl_db::ping(&pool).await?;
    println!("database ok");
    Ok(())
}

pub(crate) async fn run_db_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = shopcrawl_db::connect_pool_from_config(config).await?;
    let applied = shopcrawl_db::run_migrations(&pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}
