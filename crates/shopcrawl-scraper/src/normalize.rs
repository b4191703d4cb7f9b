//! Text normalization and conversion of extracted fields into
//! [`ExtractedRecord`]s.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Node};
use serde_json::Value;
use shopcrawl_core::ExtractedRecord;

use crate::parse::{parse_price, parse_rating, parse_review_count};
use crate::profile::fields;
use crate::urls::absolutize_url;

/// Elements that break a line when rendered. Their boundaries become a
/// space; inline markup such as `<b>` or `<sup>` is removed without one.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol",
    "p", "section", "table", "td", "th", "tr", "ul",
];

static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    let names = BLOCK_TAGS.join("|");
    Regex::new(&format!(r"(?is)</?(?:{names})\b[^>]*>")).expect("valid block-tag regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Strips markup, collapses runs of whitespace (including non-breaking
/// spaces) to a single space, and trims.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    let spaced = BLOCK_TAG_RE.replace_all(raw, " ");
    let stripped = TAG_RE.replace_all(&spaced, "");
    WHITESPACE_RE
        .replace_all(&stripped, " ")
        .trim()
        .to_owned()
}

/// Normalized text content of `el`. Text inside inline elements joins its
/// neighbours directly, so `19<sup>,99</sup>` reads `19,99`.
#[must_use]
pub fn element_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    normalize_text(&raw)
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(child_el) => {
                let block = BLOCK_TAGS.contains(&child_el.name());
                if block {
                    out.push(' ');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Builds a record from one node's extracted fields.
///
/// `single` holds the first-match value of every field, `multi` every value
/// of the multi-valued fields. Returns `None` when the title is missing.
/// Relative URLs are resolved against `page_url`.
#[must_use]
pub fn build_record(
    page_url: &str,
    single: &BTreeMap<String, Option<String>>,
    multi: &BTreeMap<String, Vec<String>>,
) -> Option<ExtractedRecord> {
    let get = |name: &str| single.get(name).and_then(Option::as_deref);

    let title = get(fields::TITLE).filter(|t| !t.is_empty())?.to_owned();

    let canonical_url = get(fields::URL).and_then(|href| absolutize_url(page_url, href));
    let image_url = get(fields::IMAGE).and_then(|src| absolutize_url(page_url, src));

    let price_display = get(fields::PRICE).unwrap_or_default().to_owned();
    let price_amount = parse_price(&price_display);
    let rating = get(fields::RATING).and_then(parse_rating);
    let review_count = get(fields::REVIEW_COUNT).and_then(parse_review_count);

    let badges = multi.get(fields::BADGES).cloned().unwrap_or_default();

    let mut raw: BTreeMap<String, Value> = single
        .iter()
        .map(|(name, value)| {
            let v = value.clone().map_or(Value::Null, Value::String);
            (name.clone(), v)
        })
        .collect();
    for (name, values) in multi {
        let resolved: Vec<Value> = if name == fields::GALLERY {
            values
                .iter()
                .filter_map(|src| absolutize_url(page_url, src))
                .map(Value::String)
                .collect()
        } else {
            values.iter().cloned().map(Value::String).collect()
        };
        raw.insert(name.clone(), Value::Array(resolved));
    }

    Some(ExtractedRecord {
        source_url: page_url.to_owned(),
        canonical_url,
        title,
        price_display,
        price_amount,
        image_url,
        rating,
        review_count,
        badges,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn single(pairs: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.map(str::to_owned)))
            .collect()
    }

    #[test]
    fn normalize_text_strips_markup_and_collapses_whitespace() {
        assert_eq!(
            normalize_text("  <b>Oak</b>\n\n   Table\u{a0}<i>XL</i> "),
            "Oak Table XL"
        );
    }

    #[test]
    fn normalize_text_keeps_words_split_by_inline_tags_whole() {
        assert_eq!(normalize_text("Oak<b>en</b> Table"), "Oaken Table");
        assert_eq!(normalize_text("19<sup>,99</sup> €"), "19,99 €");
        assert_eq!(normalize_text("<p>Oak</p><p>Table</p>"), "Oak Table");
        assert_eq!(normalize_text("Oak<br/>Table"), "Oak Table");
    }

    #[test]
    fn element_text_spaces_block_children_only() {
        use crate::document::Document;
        use crate::query::Query;

        let doc = Document::parse(
            "<div class=c><h2>Oak<b>en</b> Table</h2><span>19<sup>,99</sup>\u{a0}€</span></div>",
        );
        let el = doc.select(&Query::parse("div.c").unwrap())[0];
        assert_eq!(element_text(el), "Oaken Table 19,99 €");
    }

    #[test]
    fn normalize_text_of_blank_is_empty() {
        assert_eq!(normalize_text(" \n\t "), "");
    }

    #[test]
    fn build_record_requires_title() {
        let fields = single(&[("title", None), ("price", Some("$5"))]);
        assert!(build_record("https://shop.example/", &fields, &BTreeMap::new()).is_none());
    }

    #[test]
    fn build_record_parses_and_resolves_fields() {
        let fields = single(&[
            ("title", Some("Oak Table")),
            ("url", Some("/p/oak-table")),
            ("image", Some("//cdn.shop.example/oak.jpg")),
            ("price", Some("1.234,56 €")),
            ("rating", Some("Rated 4.5 out of 5")),
            ("review_count", Some("(1,234 reviews)")),
            ("description", None),
        ]);
        let mut multi = BTreeMap::new();
        multi.insert("badges".to_owned(), vec!["Sale".to_owned(), "New".to_owned()]);
        multi.insert("gallery".to_owned(), vec!["/g/1.jpg".to_owned()]);

        let rec = build_record("https://shop.example/catalog/?page=2", &fields, &multi).unwrap();
        assert_eq!(rec.title, "Oak Table");
        assert_eq!(
            rec.canonical_url.as_deref(),
            Some("https://shop.example/p/oak-table")
        );
        assert_eq!(
            rec.image_url.as_deref(),
            Some("https://cdn.shop.example/oak.jpg")
        );
        assert_eq!(rec.price_display, "1.234,56 €");
        assert_eq!(rec.price_amount, Some(Decimal::new(123_456, 2)));
        assert_eq!(rec.rating, Some(4.5));
        assert_eq!(rec.review_count, Some(1234));
        assert_eq!(rec.badges, vec!["Sale", "New"]);
        assert_eq!(rec.raw["description"], Value::Null);
        assert_eq!(
            rec.raw["gallery"],
            serde_json::json!(["https://shop.example/g/1.jpg"])
        );
        assert_eq!(rec.source_url, "https://shop.example/catalog/?page=2");
    }

    #[test]
    fn build_record_without_url_has_no_canonical_url() {
        let fields = single(&[("title", Some("Lamp"))]);
        let rec = build_record("https://shop.example/", &fields, &BTreeMap::new()).unwrap();
        assert!(rec.canonical_url.is_none());
        assert_eq!(rec.product_url(), "");
        assert!(rec.price_amount.is_none());
    }
}
