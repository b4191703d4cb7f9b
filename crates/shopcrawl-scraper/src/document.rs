//! Lenient HTML document wrapper.
//!
//! Parsing goes through html5ever's spec-compliant tree builder, which
//! recovers from unclosed tags, stray end tags, missing doctypes and bogus
//! entity references instead of failing. Any input, including the empty
//! string, produces a valid [`Document`].

use scraper::{ElementRef, Html};

use crate::query::Query;

/// Elements html5ever synthesizes for every input, even an empty one.
const SKELETON_ELEMENTS: [&str; 3] = ["html", "head", "body"];

/// A parsed HTML page.
///
/// Not `Send`: parse and query a `Document` between await points, never
/// across one.
pub struct Document {
    html: Html,
}

impl Document {
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    #[must_use]
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// All elements matching `query`, in document order.
    #[must_use]
    pub fn select<'a>(&'a self, query: &Query) -> Vec<ElementRef<'a>> {
        query.select_in(self.root())
    }

    /// `true` when the input held no content beyond the synthesized
    /// `html`/`head`/`body` skeleton.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let has_elements = self
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .any(|el| !SKELETON_ELEMENTS.contains(&el.value().name()));
        let has_text = self.root().text().any(|t| !t.trim().is_empty());
        !has_elements && !has_text
    }

    /// Document `<title>` text, normalized.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        let query = Query::parse("title").ok()?;
        self.select(&query)
            .first()
            .and_then(|el| query.value_of(*el))
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}
