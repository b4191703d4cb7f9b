//! `serp` command.

use std::path::Path;

use anyhow::Context;
use shopcrawl_core::AppConfig;
use shopcrawl_scraper::Fetcher;
use shopcrawl_serp::{SerpAnalyzer, SerpConfig};

use crate::print_json;

pub(crate) async fn run_serp(
    config: &AppConfig,
    keyword: Option<&str>,
    html_file: Option<&Path>,
) -> anyhow::Result<()> {
    let serp_config = SerpConfig::from_app_config(config)?;
    let fetcher = Fetcher::new(config.request_timeout_secs, &config.user_agent)?;
    let analyzer = SerpAnalyzer::new(fetcher, serp_config);

    let report = if let Some(path) = html_file {
        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let keyword = keyword.unwrap_or_default();
        let page_url = analyzer.config().search_url_for(keyword);
        analyzer.analyze_html(keyword, &html, &page_url)
    } else {
        let keyword = keyword.context("--keyword is required without --html-file")?;
        analyzer.analyze_keyword(keyword).await?
    };

    print_json(&report)
}
