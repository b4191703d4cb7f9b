//! Fallback-chain extraction of repeated record blocks and their fields.
//!
//! Record patterns are tried in order and the first one with at least one
//! match supplies every record node; results are never merged across
//! patterns. Fields apply the same rule independently, per node, over their
//! own query lists.

use std::collections::BTreeMap;

use scraper::ElementRef;
use shopcrawl_core::ExtractedRecord;

use crate::document::Document;
use crate::normalize::build_record;
use crate::profile::{fields, ExtractionProfile};
use crate::query::Query;

/// The winning record pattern and the nodes it matched.
#[derive(Debug)]
pub struct RecordMatch<'a> {
    /// Index into the candidate pattern list.
    pub pattern_index: usize,
    pub nodes: Vec<ElementRef<'a>>,
}

/// Evaluates `patterns` in order and returns the first with ≥1 match.
#[must_use]
pub fn match_records<'a>(doc: &'a Document, patterns: &[Query]) -> Option<RecordMatch<'a>> {
    patterns.iter().enumerate().find_map(|(pattern_index, pattern)| {
        let nodes = doc.select(pattern);
        (!nodes.is_empty()).then_some(RecordMatch {
            pattern_index,
            nodes,
        })
    })
}

/// Record nodes of the first matching pattern, or an empty list.
#[must_use]
pub fn find_records<'a>(doc: &'a Document, patterns: &[Query]) -> Vec<ElementRef<'a>> {
    match_records(doc, patterns).map_or_else(Vec::new, |m| m.nodes)
}

/// First non-empty value produced by `queries`, tried in order.
#[must_use]
pub fn extract_field(node: ElementRef<'_>, queries: &[Query]) -> Option<String> {
    queries.iter().find_map(|query| {
        query
            .select_in(node)
            .into_iter()
            .find_map(|el| query.value_of(el))
    })
}

/// Every value of the first query that produces any, in document order with
/// duplicates dropped.
#[must_use]
pub fn extract_field_all(node: ElementRef<'_>, queries: &[Query]) -> Vec<String> {
    for query in queries {
        let mut values: Vec<String> = Vec::new();
        for value in query
            .select_in(node)
            .into_iter()
            .filter_map(|el| query.value_of(el))
        {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        if !values.is_empty() {
            return values;
        }
    }
    Vec::new()
}

/// Extracts every field of `field_queries` from `node`. Fields that match
/// nothing map to `None`.
#[must_use]
pub fn extract_fields(
    node: ElementRef<'_>,
    field_queries: &BTreeMap<String, Vec<Query>>,
) -> BTreeMap<String, Option<String>> {
    field_queries
        .iter()
        .map(|(name, queries)| (name.clone(), extract_field(node, queries)))
        .collect()
}

/// Runs `profile` over `doc` and builds one record per matched node.
///
/// Nodes without a title are dropped. Relative links resolve against
/// `page_url`.
#[must_use]
pub fn extract_records(
    doc: &Document,
    profile: &ExtractionProfile,
    page_url: &str,
) -> Vec<ExtractedRecord> {
    let Some(matched) = match_records(doc, profile.record_patterns()) else {
        tracing::debug!(
            page_url,
            profile = profile.name(),
            "no record pattern matched"
        );
        return Vec::new();
    };

    tracing::debug!(
        page_url,
        profile = profile.name(),
        pattern = profile.record_patterns()[matched.pattern_index].as_str(),
        nodes = matched.nodes.len(),
        "record pattern selected"
    );

    let mut skipped = 0usize;
    let records: Vec<ExtractedRecord> = matched
        .nodes
        .iter()
        .filter_map(|node| {
            let single = extract_fields(*node, profile.fields());
            let multi: BTreeMap<String, Vec<String>> = fields::MULTI_VALUED
                .iter()
                .filter_map(|name| {
                    let queries = profile.fields().get(*name)?;
                    Some(((*name).to_owned(), extract_field_all(*node, queries)))
                })
                .collect();
            let record = build_record(page_url, &single, &multi);
            if record.is_none() {
                skipped += 1;
            }
            record
        })
        .collect();

    if skipped > 0 {
        tracing::debug!(page_url, skipped, "dropped nodes without a title");
    }

    records
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
