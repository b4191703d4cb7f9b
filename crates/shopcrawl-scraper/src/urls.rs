//! URL helpers: listing page URLs, relative link resolution, host matching.

use reqwest::Url;

use crate::error::ScraperError;

/// Placeholder substituted with the page number in templated base URLs.
const PAGE_PLACEHOLDER: &str = "{page}";

/// Parses and checks a crawl base URL.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidBaseUrl`] when the URL is blank, does not
/// parse, or is not `http(s)`.
pub fn parse_base_url(raw: &str) -> Result<Url, ScraperError> {
    let trimmed = raw.trim();
    let invalid = |reason: String| ScraperError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason,
    };

    if trimmed.is_empty() {
        return Err(invalid("base URL is empty".to_owned()));
    }

    // The placeholder is not valid in every URL position; probe with page 1.
    let probe = trimmed.replace(PAGE_PLACEHOLDER, "1");
    let url = Url::parse(&probe).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("URL has no host".to_owned()));
    }

    Ok(url)
}

/// Builds the URL of listing page `page`.
///
/// A base containing `{page}` gets the number substituted. Otherwise page 1
/// is the base itself and later pages set `page_param` in the query string,
/// replacing any existing value.
#[must_use]
pub fn page_url(base: &str, page: u32, page_param: &str) -> String {
    if base.contains(PAGE_PLACEHOLDER) {
        return base.replace(PAGE_PLACEHOLDER, &page.to_string());
    }
    if page <= 1 {
        return base.to_owned();
    }

    let Ok(mut url) = Url::parse(base) else {
        let sep = if base.contains('?') { '&' } else { '?' };
        return format!("{base}{sep}{page_param}={page}");
    };

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != page_param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(page_param, &page.to_string());
    }
    url.to_string()
}

/// Resolves `href` against `base`, returning an absolute `http(s)` URL.
///
/// Fragments-only links, `javascript:`, `mailto:` and `data:` URLs yield
/// `None`.
#[must_use]
pub fn absolutize_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "data:", "tel:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = match Url::parse(href) {
        Ok(url) => url,
        Err(_) => Url::parse(base).ok()?.join(href).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Lowercased host of `url` with any leading `www.` removed.
#[must_use]
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.trim_start_matches("www.").to_owned())
}

/// `true` when `host` is `domain` or one of its subdomains.
#[must_use]
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_start_matches("www.").to_ascii_lowercase();
    let domain = domain.trim().trim_start_matches("www.").to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}
