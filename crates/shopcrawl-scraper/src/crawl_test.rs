use std::collections::VecDeque;
use std::sync::Mutex;

use shopcrawl_core::ProfileConfig;

use super::*;
use crate::error::FetchError;
use crate::fetch::FetchedPage;

/// Serves a fixed script of page bodies (or failures) and records every
/// requested URL.
struct ScriptedSource {
    script: Mutex<VecDeque<Result<String, u16>>>,
    requested: Mutex<Vec<String>>,
    /// Cancels the token once this many fetches have been served.
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<String, u16>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requested: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }

    fn cancelling_after(mut self, fetches: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((fetches, token));
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl PageSource for ScriptedSource {
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let served = {
            let mut requested = self.requested.lock().unwrap();
            requested.push(url.to_owned());
            requested.len()
        };
        if let Some((after, token)) = &self.cancel_after {
            if served >= *after {
                token.cancel();
            }
        }

        // An exhausted script behaves like an empty listing page.
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()));
        match next {
            Ok(body) => Ok(FetchedPage {
                url: url.to_owned(),
                status: 200,
                body,
            }),
            Err(status) => Err(FetchError::Status {
                url: url.to_owned(),
                status,
            }),
        }
    }
}

fn listing(page: usize, items: usize) -> String {
    let mut html = String::from("<!doctype html><html><body><ul class=products>");
    for i in 0..items {
        html.push_str(&format!(
            "<li class=product><a href=\"/p/{page}-{i}\"><h2>Item {page}-{i}</h2></a>\
             <span class=price>${i}.99</span></li>"
        ));
    }
    html.push_str("</ul></body></html>");
    html
}

fn test_profile() -> ExtractionProfile {
    let config = ProfileConfig {
        name: "listing".to_owned(),
        record_patterns: vec!["li.product".to_owned()],
        fields: [
            ("title".to_owned(), vec!["h2".to_owned()]),
            ("url".to_owned(), vec!["a@href".to_owned()]),
            ("price".to_owned(), vec![".price".to_owned()]),
        ]
        .into_iter()
        .collect(),
    };
    ExtractionProfile::compile(&config).unwrap()
}

fn config(max_pages: u32) -> CrawlConfig {
    CrawlConfig::new("https://shop.example/catalog/", max_pages)
        .unwrap()
        .with_delay(Duration::ZERO)
}

// ---------------------------------------------------------------------------
// CrawlConfig
// ---------------------------------------------------------------------------

#[test]
fn config_rejects_missing_base_url() {
    assert!(matches!(
        CrawlConfig::new("", 3),
        Err(ScraperError::InvalidBaseUrl { .. })
    ));
    assert!(CrawlConfig::new("shop.example/catalog", 3).is_err());
}

#[test]
fn config_rejects_zero_pages() {
    assert!(matches!(
        CrawlConfig::new("https://shop.example/", 0),
        Err(ScraperError::InvalidCrawlSettings(_))
    ));
    assert!(CrawlConfig::new("https://shop.example/", 1)
        .unwrap()
        .with_start_page(0)
        .is_err());
    assert!(CrawlConfig::new("https://shop.example/", 1)
        .unwrap()
        .with_page_param(" ")
        .is_err());
}

#[test]
fn config_defaults() {
    let cfg = CrawlConfig::new(" https://shop.example/catalog/ ", 3).unwrap();
    assert_eq!(cfg.base_url(), "https://shop.example/catalog/");
    assert_eq!(cfg.start_page(), 1);
    assert_eq!(cfg.delay(), DEFAULT_INTER_REQUEST_DELAY);
    assert_eq!(cfg.page_param(), "page");
    assert_eq!(cfg.last_page(), 3);
}

#[test]
fn last_page_counts_from_start_page() {
    let cfg = CrawlConfig::new("https://shop.example/", 3)
        .unwrap()
        .with_start_page(4)
        .unwrap();
    assert_eq!(cfg.last_page(), 6);
}

#[test]
fn termination_reason_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&TerminationReason::NoRecordsFound).unwrap(),
        "\"no_records_found\""
    );
    assert_eq!(TerminationReason::MaxPagesReached.to_string(), "max_pages_reached");
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stops_after_n_plus_one_fetches_on_empty_page() {
    for n in 1..=4 {
        let mut script: Vec<Result<String, u16>> = (1..=n).map(|p| Ok(listing(p, 3))).collect();
        script.push(Ok(listing(n + 1, 0)));
        let source = ScriptedSource::new(script);

        let controller = CrawlController::new(source, test_profile(), config(10));
        let outcome = controller.run().await;

        assert_eq!(controller.source.requested().len(), n + 1, "fetches for n={n}");
        assert_eq!(
            outcome.session.termination_reason,
            Some(TerminationReason::NoRecordsFound)
        );
        assert_eq!(outcome.records.len(), n * 3);
        assert_eq!(outcome.session.collected, n * 3);
        assert_eq!(outcome.records.last().unwrap().title, format!("Item {n}-2"));
    }
}

#[tokio::test]
async fn example_catalog_crawl_collects_forty_records() {
    let source = ScriptedSource::new(vec![
        Ok(listing(1, 20)),
        Ok(listing(2, 20)),
        Ok(listing(3, 0)),
    ]);
    let controller = CrawlController::new(source, test_profile(), config(3));
    let outcome = controller.run().await;

    assert_eq!(outcome.records.len(), 40);
    assert_eq!(
        outcome.session.termination_reason,
        Some(TerminationReason::NoRecordsFound)
    );
    assert_eq!(outcome.session.pages_fetched, 3);
    assert_eq!(outcome.session.current_page, 3);
    assert_eq!(
        controller.source.requested(),
        vec![
            "https://shop.example/catalog/",
            "https://shop.example/catalog/?page=2",
            "https://shop.example/catalog/?page=3",
        ]
    );
}

#[tokio::test]
async fn records_keep_page_then_document_order() {
    let source = ScriptedSource::new(vec![Ok(listing(1, 2)), Ok(listing(2, 2))]);
    let controller = CrawlController::new(source, test_profile(), config(2));
    let outcome = controller.run().await;

    let titles: Vec<&str> = outcome.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Item 1-0", "Item 1-1", "Item 2-0", "Item 2-1"]);
    assert_eq!(
        outcome.records[2].canonical_url.as_deref(),
        Some("https://shop.example/p/2-0")
    );
    assert_eq!(
        outcome.records[2].source_url,
        "https://shop.example/catalog/?page=2"
    );
}

#[tokio::test]
async fn stops_at_max_pages() {
    let source = ScriptedSource::new((1..=5).map(|p| Ok(listing(p, 4))).collect());
    let controller = CrawlController::new(source, test_profile(), config(2));
    let outcome = controller.run().await;

    assert_eq!(controller.source.requested().len(), 2);
    assert_eq!(outcome.records.len(), 8);
    assert_eq!(
        outcome.session.termination_reason,
        Some(TerminationReason::MaxPagesReached)
    );
    assert!(outcome.session.finished_at.is_some());
}

#[tokio::test]
async fn fetch_error_keeps_collected_pages() {
    let source = ScriptedSource::new(vec![Ok(listing(1, 5)), Ok(listing(2, 5)), Err(503)]);
    let controller = CrawlController::new(source, test_profile(), config(10));
    let outcome = controller.run().await;

    assert_eq!(controller.source.requested().len(), 3);
    assert_eq!(outcome.records.len(), 10);
    assert_eq!(
        outcome.session.termination_reason,
        Some(TerminationReason::FetchError)
    );
    assert_eq!(outcome.session.pages_fetched, 2);
    assert!(outcome.session.last_error.as_deref().unwrap().contains("503"));
}

#[tokio::test]
async fn first_page_failure_yields_no_records() {
    let source = ScriptedSource::new(vec![Err(404)]);
    let controller = CrawlController::new(source, test_profile(), config(3));
    let outcome = controller.run().await;

    assert!(outcome.records.is_empty());
    assert_eq!(
        outcome.session.termination_reason,
        Some(TerminationReason::FetchError)
    );
}

#[tokio::test]
async fn malformed_page_without_matches_ends_crawl() {
    let source = ScriptedSource::new(vec![
        Ok(listing(1, 2)),
        Ok("<div><p>unclosed <b>markup &bogus;".to_owned()),
    ]);
    let controller = CrawlController::new(source, test_profile(), config(5));
    let outcome = controller.run().await;

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(
        outcome.session.termination_reason,
        Some(TerminationReason::NoRecordsFound)
    );
}

#[tokio::test]
async fn templated_base_url_is_substituted() {
    let source = ScriptedSource::new(vec![Ok(listing(1, 1)), Ok(listing(2, 1))]);
    let cfg = CrawlConfig::new("https://shop.example/catalog/page/{page}/", 2)
        .unwrap()
        .with_delay(Duration::ZERO);
    let controller = CrawlController::new(source, test_profile(), cfg);
    controller.run().await;

    assert_eq!(
        controller.source.requested(),
        vec![
            "https://shop.example/catalog/page/1/",
            "https://shop.example/catalog/page/2/",
        ]
    );
}

#[tokio::test]
async fn cancelled_before_start_fetches_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let source = ScriptedSource::new(vec![Ok(listing(1, 3))]);
    let controller = CrawlController::new(source, test_profile(), config(3));
    let outcome = controller.run_with_cancel(&token).await;

    assert!(controller.source.requested().is_empty());
    assert!(outcome.records.is_empty());
    assert_eq!(
        outcome.session.termination_reason,
        Some(TerminationReason::Cancelled)
    );
}

#[tokio::test]
async fn cancellation_is_observed_at_the_next_page_boundary() {
    let token = CancellationToken::new();
    let source = ScriptedSource::new((1..=5).map(|p| Ok(listing(p, 2))).collect())
        .cancelling_after(2, token.clone());
    let controller = CrawlController::new(source, test_profile(), config(5));
    let outcome = controller.run_with_cancel(&token).await;

    // The fetch in flight when the signal arrived still completes.
    assert_eq!(controller.source.requested().len(), 2);
    assert_eq!(outcome.records.len(), 4);
    assert_eq!(
        outcome.session.termination_reason,
        Some(TerminationReason::Cancelled)
    );
}

#[tokio::test(start_paused = true)]
async fn pages_are_paced_by_the_configured_delay() {
    let source = ScriptedSource::new((1..=3).map(|p| Ok(listing(p, 1))).collect());
    let cfg = CrawlConfig::new("https://shop.example/catalog/", 3)
        .unwrap()
        .with_delay(Duration::from_secs(2));
    let controller = CrawlController::new(source, test_profile(), cfg);

    let started = tokio::time::Instant::now();
    let outcome = controller.run().await;

    assert_eq!(outcome.records.len(), 3);
    assert!(started.elapsed() >= Duration::from_secs(4));
}

#[tokio::test]
async fn outcome_serializes_to_json() {
    let source = ScriptedSource::new(vec![Ok(listing(1, 1))]);
    let controller = CrawlController::new(source, test_profile(), config(1));
    let outcome = controller.run().await;

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["session"]["termination_reason"], "max_pages_reached");
    assert_eq!(json["records"][0]["title"], "Item 1-0");
}
