//! Paginated crawl driver.
//!
//! One controller runs one crawl: fetch a listing page, parse it, extract
//! records, then either stop or pace and move to the next page. Pages are
//! strictly sequential and every failure ends the crawl at the last page
//! boundary; records collected before the stop are always returned.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopcrawl_core::{AppConfig, ExtractedRecord};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::document::Document;
use crate::error::ScraperError;
use crate::extract::extract_records;
use crate::fetch::PageSource;
use crate::profile::ExtractionProfile;
use crate::rate_limit::RequestPacer;
use crate::urls::{page_url, parse_base_url};

/// Delay between page requests when none is configured.
pub const DEFAULT_INTER_REQUEST_DELAY: Duration = Duration::from_secs(3);

pub const DEFAULT_PAGE_PARAM: &str = "page";

/// Validated settings for one crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    base_url: String,
    start_page: u32,
    max_pages: u32,
    delay: Duration,
    page_param: String,
}

impl CrawlConfig {
    /// Checks `base_url` and `max_pages` before any network call.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] for a blank, unparseable or
    /// non-http(s) URL and [`ScraperError::InvalidCrawlSettings`] when
    /// `max_pages` is zero.
    pub fn new(base_url: &str, max_pages: u32) -> Result<Self, ScraperError> {
        parse_base_url(base_url)?;
        if max_pages == 0 {
            return Err(ScraperError::InvalidCrawlSettings(
                "max_pages must be at least 1".to_owned(),
            ));
        }
        Ok(Self {
            base_url: base_url.trim().to_owned(),
            start_page: 1,
            max_pages,
            delay: DEFAULT_INTER_REQUEST_DELAY,
            page_param: DEFAULT_PAGE_PARAM.to_owned(),
        })
    }

    /// Builds crawl settings from application config, with `base_url` and
    /// `max_pages` overriding the configured values when given.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidCrawlSettings`] when no base URL is
    /// available, or any error from [`Self::new`] and the builder methods.
    pub fn from_app_config(
        config: &AppConfig,
        base_url: Option<&str>,
        max_pages: Option<u32>,
    ) -> Result<Self, ScraperError> {
        let base_url = base_url
            .or(config.crawl_base_url.as_deref())
            .ok_or_else(|| {
                ScraperError::InvalidCrawlSettings(
                    "no crawl base URL configured (set SHOPCRAWL_CRAWL_BASE_URL)".to_owned(),
                )
            })?;
        Self::new(base_url, max_pages.unwrap_or(config.crawl_max_pages))?
            .with_start_page(config.crawl_start_page)?
            .with_page_param(&config.page_param)
            .map(|c| c.with_delay(Duration::from_millis(config.inter_request_delay_ms)))
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidCrawlSettings`] when `start_page` is 0.
    pub fn with_start_page(mut self, start_page: u32) -> Result<Self, ScraperError> {
        if start_page == 0 {
            return Err(ScraperError::InvalidCrawlSettings(
                "start_page must be at least 1".to_owned(),
            ));
        }
        self.start_page = start_page;
        Ok(self)
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidCrawlSettings`] for a blank parameter
    /// name.
    pub fn with_page_param(mut self, page_param: &str) -> Result<Self, ScraperError> {
        let page_param = page_param.trim();
        if page_param.is_empty() {
            return Err(ScraperError::InvalidCrawlSettings(
                "page_param must not be empty".to_owned(),
            ));
        }
        page_param.clone_into(&mut self.page_param);
        Ok(self)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    #[must_use]
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn page_param(&self) -> &str {
        &self.page_param
    }

    /// Last page number the crawl may fetch.
    #[must_use]
    pub fn last_page(&self) -> u32 {
        self.start_page.saturating_add(self.max_pages - 1)
    }
}

/// Why a crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MaxPagesReached,
    NoRecordsFound,
    FetchError,
    Cancelled,
}

impl TerminationReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MaxPagesReached => "max_pages_reached",
            Self::NoRecordsFound => "no_records_found",
            Self::FetchError => "fetch_error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one crawl invocation. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSession {
    pub id: Uuid,
    pub base_url: String,
    pub start_page: u32,
    pub max_pages: u32,
    /// Page most recently attempted.
    pub current_page: u32,
    pub pages_fetched: u32,
    /// Records collected so far.
    pub collected: usize,
    /// `None` while the crawl is running.
    pub termination_reason: Option<TerminationReason>,
    /// Message of the fetch failure that ended the crawl, if any.
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlSession {
    fn start(config: &CrawlConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            base_url: config.base_url.clone(),
            start_page: config.start_page,
            max_pages: config.max_pages,
            current_page: config.start_page,
            pages_fetched: 0,
            collected: 0,
            termination_reason: None,
            last_error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn finish(&mut self, reason: TerminationReason) {
        self.termination_reason = Some(reason);
        self.finished_at = Some(Utc::now());
    }
}

/// Result of a crawl: the finished session and every record collected, in
/// page order and document order within a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub session: CrawlSession,
    pub records: Vec<ExtractedRecord>,
}

/// Drives fetch → parse → extract across listing pages.
pub struct CrawlController<S> {
    source: S,
    profile: ExtractionProfile,
    config: CrawlConfig,
}

impl<S: PageSource> CrawlController<S> {
    #[must_use]
    pub fn new(source: S, profile: ExtractionProfile, config: CrawlConfig) -> Self {
        Self {
            source,
            profile,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs the crawl to completion.
    pub async fn run(&self) -> CrawlOutcome {
        self.run_with_cancel(&CancellationToken::new()).await
    }

    /// Runs the crawl, checking `cancel` at the top of every page iteration
    /// and during the inter-request delay. An in-flight fetch is not
    /// interrupted.
    pub async fn run_with_cancel(&self, cancel: &CancellationToken) -> CrawlOutcome {
        let mut session = CrawlSession::start(&self.config);
        let mut pacer = RequestPacer::new(self.config.delay);
        let mut records: Vec<ExtractedRecord> = Vec::new();
        let last_page = self.config.last_page();
        let mut page = self.config.start_page;

        tracing::info!(
            crawl_id = %session.id,
            base_url = %self.config.base_url,
            profile = self.profile.name(),
            start_page = self.config.start_page,
            last_page,
            "crawl started"
        );

        let reason = loop {
            if cancel.is_cancelled() || !pacer.wait(cancel).await {
                break TerminationReason::Cancelled;
            }

            session.current_page = page;
            let url = page_url(&self.config.base_url, page, &self.config.page_param);

            let fetched = match self.source.fetch_page(&url).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    tracing::warn!(
                        crawl_id = %session.id,
                        page,
                        url = %url,
                        error = %e,
                        "page fetch failed, stopping crawl"
                    );
                    session.last_error = Some(e.to_string());
                    break TerminationReason::FetchError;
                }
            };
            session.pages_fetched += 1;

            let page_records = extract_page(&fetched.body, &self.profile, &url);
            tracing::info!(
                crawl_id = %session.id,
                page,
                url = %url,
                records = page_records.len(),
                "page extracted"
            );

            if page_records.is_empty() {
                break TerminationReason::NoRecordsFound;
            }
            session.collected += page_records.len();
            records.extend(page_records);

            if page >= last_page {
                break TerminationReason::MaxPagesReached;
            }
            page += 1;
        };

        session.finish(reason);
        tracing::info!(
            crawl_id = %session.id,
            reason = %reason,
            pages_fetched = session.pages_fetched,
            records = records.len(),
            "crawl finished"
        );

        CrawlOutcome { session, records }
    }
}

/// Parses and extracts one page. Kept synchronous so the non-`Send`
/// document never lives across an await point.
fn extract_page(body: &str, profile: &ExtractionProfile, url: &str) -> Vec<ExtractedRecord> {
    let doc = Document::parse(body);
    extract_records(&doc, profile, url)
}

#[cfg(test)]
#[path = "crawl_test.rs"]
mod tests;
