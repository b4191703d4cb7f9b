pub mod crawl;
pub mod document;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod parse;
pub mod profile;
pub mod query;
pub mod rate_limit;
pub mod urls;

pub use crawl::{CrawlConfig, CrawlController, CrawlOutcome, CrawlSession, TerminationReason};
pub use document::Document;
pub use error::{FetchError, FetchErrorKind, ScraperError};
pub use extract::{
    extract_field, extract_field_all, extract_fields, extract_records, find_records, match_records,
    RecordMatch,
};
pub use fetch::{FetchOptions, FetchedPage, Fetcher, PageSource};
pub use normalize::{build_record, element_text, normalize_text};
pub use parse::{parse_price, parse_rating, parse_review_count};
pub use profile::ExtractionProfile;
pub use query::Query;
