//! `crawl` command: run the crawl controller, then persist what it found.

use shopcrawl_core::{AppConfig, RecordStore};
use shopcrawl_db::PgRecordStore;
use shopcrawl_scraper::profile::GENERIC_PROFILE_NAME;
use shopcrawl_scraper::{CrawlConfig, CrawlController, ExtractionProfile, Fetcher};
use tokio_util::sync::CancellationToken;

use crate::print_json;
use crate::store::connect;

pub(crate) async fn run_crawl(
    config: &AppConfig,
    base_url: Option<&str>,
    max_pages: Option<u32>,
    profile: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    // Configuration errors surface before any request goes out.
    let crawl_config = CrawlConfig::from_app_config(config, base_url, max_pages)?;
    let profile = load_profile(config, profile)?;
    let fetcher = Fetcher::new(config.request_timeout_secs, &config.user_agent)?;

    let controller = CrawlController::new(fetcher, profile, crawl_config);
    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(cancel.clone());
    let outcome = controller.run_with_cancel(&cancel).await;
    watcher.abort();

    let saved = if dry_run {
        None
    } else {
        let store = PgRecordStore::new(connect(config).await?);
        let saved = store
            .upsert(&outcome.records, controller.config().base_url())
            .await;
        tracing::info!(
            saved,
            extracted = outcome.records.len(),
            "crawl results stored"
        );
        Some(saved)
    };

    print_json(&serde_json::json!({
        "session": outcome.session,
        "saved": saved,
        "records": outcome.records,
    }))
}

pub(crate) fn load_profile(
    config: &AppConfig,
    name: Option<&str>,
) -> anyhow::Result<ExtractionProfile> {
    match (&config.profiles_path, name) {
        (Some(path), name) => Ok(ExtractionProfile::from_file(path, name)?),
        (None, None) => Ok(ExtractionProfile::generic()),
        (None, Some(name)) if name == GENERIC_PROFILE_NAME => Ok(ExtractionProfile::generic()),
        (None, Some(name)) => anyhow::bail!(
            "profile '{name}' requested but SHOPCRAWL_PROFILES_PATH is not set"
        ),
    }
}

fn cancel_on_ctrl_c(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current page");
            cancel.cancel();
        }
    })
}
