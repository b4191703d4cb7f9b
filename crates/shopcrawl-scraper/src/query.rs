//! Structural queries: a CSS selector plus an optional attribute to read.
//!
//! Written as `selector` (read normalized text) or `selector@attr` (read an
//! attribute). An empty selector or `:self` addresses the scope element
//! itself, so `@href` reads the record node's own `href`.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::error::ScraperError;
use crate::normalize::{element_text, normalize_text};

static ATTR_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_:.\-]*$").expect("valid attribute-name regex")
});

const SELF_SELECTOR: &str = ":self";

/// A compiled query.
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    selector: Option<Selector>,
    attr: Option<String>,
}

impl Query {
    /// Compiles `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidQuery`] if the selector part is not
    /// valid CSS or the query is blank.
    pub fn parse(raw: &str) -> Result<Self, ScraperError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScraperError::InvalidQuery {
                query: raw.to_owned(),
                reason: "query is empty".to_owned(),
            });
        }

        let (selector_part, attr) = split_attr(trimmed);

        let selector = if selector_part.is_empty() || selector_part == SELF_SELECTOR {
            None
        } else {
            let compiled =
                Selector::parse(selector_part).map_err(|e| ScraperError::InvalidQuery {
                    query: raw.to_owned(),
                    reason: e.to_string(),
                })?;
            Some(compiled)
        };

        if selector.is_none() && attr.is_none() {
            return Err(ScraperError::InvalidQuery {
                query: raw.to_owned(),
                reason: "a self query must name an attribute".to_owned(),
            });
        }

        Ok(Self {
            source: trimmed.to_owned(),
            selector,
            attr: attr.map(str::to_owned),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn attr(&self) -> Option<&str> {
        self.attr.as_deref()
    }

    /// Elements under `scope` matched by the selector, in document order.
    /// A self query yields `scope` itself.
    #[must_use]
    pub fn select_in<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        match &self.selector {
            Some(selector) => scope.select(selector).collect(),
            None => vec![scope],
        }
    }

    /// Reads this query's value from `el`: the named attribute, or the
    /// element's text. Returns `None` when the value is missing or blank
    /// after normalization.
    #[must_use]
    pub fn value_of(&self, el: ElementRef<'_>) -> Option<String> {
        let normalized = match &self.attr {
            Some(attr) => normalize_text(el.value().attr(attr)?),
            None => element_text(el),
        };
        (!normalized.is_empty()).then_some(normalized)
    }
}

/// Splits a trailing `@attr` off the query when it is a plausible attribute
/// name; `@` inside attribute selectors is left alone.
fn split_attr(query: &str) -> (&str, Option<&str>) {
    if let Some((selector, attr)) = query.rsplit_once('@') {
        let brackets_balanced = selector.matches('[').count() == selector.matches(']').count();
        if brackets_balanced && ATTR_NAME_RE.is_match(attr) {
            return (selector.trim(), Some(attr));
        }
    }
    (query, None)
}
