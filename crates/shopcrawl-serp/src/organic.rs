//! Organic result extraction and result-count parsing.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use shopcrawl_scraper::urls::{absolutize_url, host_of};
use shopcrawl_scraper::{element_text, extract_field, match_records, Document, Query};

/// One ranked organic result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganicResult {
    /// 1-based rank among organic results.
    pub position: u32,
    pub title: String,
    pub url: String,
    /// Host of `url`, lowercased, without `www.`.
    pub domain: String,
}

fn compile(patterns: &[&str]) -> Vec<Query> {
    patterns
        .iter()
        .map(|p| Query::parse(p).expect("built-in organic pattern is valid"))
        .collect()
}

static RESULT_BLOCKS: LazyLock<Vec<Query>> = LazyLock::new(|| {
    compile(&[
        "[data-feature=\"organic\"]",
        "#search div.g",
        "div.g",
        "li.b_algo",
        ".result.results_links",
        ".organic-result",
    ])
});
static TITLE: LazyLock<Vec<Query>> =
    LazyLock::new(|| compile(&["h3", "h2", ".result__title", "a"]));
static LINK: LazyLock<Vec<Query>> = LazyLock::new(|| {
    compile(&[
        "h2 a@href",
        "h3 a@href",
        "a.result__a@href",
        "a[data-ved]@href",
        "a@href",
    ])
});

static RESULT_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:about\s+)?(\d[\d,.']*)\s+results").expect("valid result-count regex")
});
static RESULT_STATS: LazyLock<Query> =
    LazyLock::new(|| Query::parse("#result-stats").expect("valid result-stats query"));

/// Ranked organic results on a results page. Relative and redirect links
/// (`/url?q=…`) are resolved against `page_url`; blocks without a usable
/// title or link, and repeats of an earlier URL, are skipped.
#[must_use]
pub fn extract_organic(doc: &Document, page_url: &str) -> Vec<OrganicResult> {
    extract_organic_nodes(doc, page_url)
        .into_iter()
        .map(|(_, result)| result)
        .collect()
}

pub(crate) fn extract_organic_nodes<'a>(
    doc: &'a Document,
    page_url: &str,
) -> Vec<(ElementRef<'a>, OrganicResult)> {
    let Some(matched) = match_records(doc, &RESULT_BLOCKS) else {
        return Vec::new();
    };

    let mut results: Vec<(ElementRef<'a>, OrganicResult)> = Vec::new();
    for node in matched.nodes {
        let Some(title) = extract_field(node, &TITLE) else {
            continue;
        };
        let Some(url) = extract_field(node, &LINK).and_then(|href| resolve_link(page_url, &href))
        else {
            continue;
        };
        if results.iter().any(|(_, r)| r.url == url) {
            continue;
        }
        let Some(domain) = host_of(&url) else {
            continue;
        };
        let position = u32::try_from(results.len() + 1).unwrap_or(u32::MAX);
        results.push((
            node,
            OrganicResult {
                position,
                title,
                url,
                domain,
            },
        ));
    }
    results
}

/// Absolutizes `href` and unwraps search-engine redirect links.
fn resolve_link(page_url: &str, href: &str) -> Option<String> {
    let absolute = absolutize_url(page_url, href)?;
    let parsed = Url::parse(&absolute).ok()?;
    if parsed.path() == "/url" {
        let target = parsed
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned())?;
        return absolutize_url(page_url, &target);
    }
    Some(absolute)
}

/// Total result count from the result-stats line, e.g.
/// `"About 1,230,000 results (0.41 seconds)"`.
#[must_use]
pub fn parse_total_results(doc: &Document) -> Option<u64> {
    let stats = doc
        .select(&RESULT_STATS)
        .first()
        .and_then(|el| RESULT_STATS.value_of(*el));
    let text = stats.unwrap_or_else(|| element_text(doc.root()));
    let caps = RESULT_COUNT_RE.captures(&text)?;
    let digits: String = caps[1].chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Document-order index of every element in `els`. Elements not found map
/// to `usize::MAX`.
pub(crate) fn document_positions(doc: &Document, els: &[ElementRef<'_>]) -> Vec<usize> {
    let mut positions = vec![usize::MAX; els.len()];
    for (index, node) in doc.root().descendants().enumerate() {
        for (slot, el) in els.iter().enumerate() {
            if node == **el {
                positions[slot] = index;
            }
        }
    }
    positions
}
