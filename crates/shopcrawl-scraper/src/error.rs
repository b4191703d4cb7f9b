use thiserror::Error;

/// Failure of a single page fetch. Never retried by the fetcher itself.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Coarse classification of a [`FetchError`] for callers that only branch
/// on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Timeout,
    Non2xx(u16),
}

impl FetchError {
    /// Classifies a transport error raised while sending `url`.
    pub(crate) fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_owned(),
            }
        } else {
            Self::Network {
                url: url.to_owned(),
                source: err,
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Network { .. } | Self::Body { .. } => FetchErrorKind::Network,
            Self::Timeout { .. } => FetchErrorKind::Timeout,
            Self::Status { status, .. } => FetchErrorKind::Non2xx(*status),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::Status { url, .. }
            | Self::Body { url, .. } => url,
        }
    }
}

/// Configuration-time failures. These are the only errors that abort a crawl
/// before it starts.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid crawl settings: {0}")]
    InvalidCrawlSettings(String),

    #[error("invalid query \"{query}\": {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error(transparent)]
    Profile(#[from] shopcrawl_core::ConfigError),
}
