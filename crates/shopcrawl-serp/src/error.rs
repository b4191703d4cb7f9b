use shopcrawl_scraper::{FetchError, ScraperError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerpError {
    #[error("invalid search URL \"{url}\": {reason}")]
    InvalidSearchUrl { url: String, reason: String },

    #[error("keyword must not be empty")]
    EmptyKeyword,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Scraper(#[from] ScraperError),
}
