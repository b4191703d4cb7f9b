//! Single-shot HTTP GET for listing and results pages.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::error::{FetchError, ScraperError};

/// Per-request settings. Headers are sent in addition to the client's
/// identity headers and override them on name clashes.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            headers: Vec::new(),
        }
    }
}

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Anything that can turn a URL into page HTML.
///
/// The crawl controller and SERP analyzer depend on this seam rather than on
/// [`Fetcher`] so tests can script page sequences without a network.
pub trait PageSource: Send + Sync {
    fn fetch_page(&self, url: &str)
        -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

/// HTTP fetcher with a fixed identity and timeout.
///
/// Non-2xx responses come back as [`FetchError::Status`] rather than as a
/// page. There is no retry: callers decide what a failure means.
pub struct Fetcher {
    client: Client,
    options: FetchOptions,
}

impl Fetcher {
    /// Creates a `Fetcher` with the given timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Client`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        Self::with_options(
            user_agent,
            FetchOptions {
                timeout: Duration::from_secs(timeout_secs),
                headers: Vec::new(),
            },
        )
    }

    /// Creates a `Fetcher` whose every request uses `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Client`] if the client cannot be built.
    pub fn with_options(user_agent: &str, options: FetchOptions) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, options })
    }

    /// Fetches `url` with the fetcher's default options.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_with`].
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetch_with(url, &self.options).await
    }

    /// Issues one GET for `url`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Timeout`] — the request exceeded `options.timeout`.
    /// - [`FetchError::Network`] — connection, DNS, or TLS failure.
    /// - [`FetchError::Status`] — any non-2xx status.
    /// - [`FetchError::Body`] — the body could not be read as text.
    pub async fn fetch_with(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<FetchedPage, FetchError> {
        let mut request = self
            .client
            .get(url)
            .timeout(options.timeout)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(reqwest::header::CACHE_CONTROL, "no-cache");

        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_transport(url, e))?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_owned(),
                }
            } else {
                FetchError::Body {
                    url: url.to_owned(),
                    source: e,
                }
            }
        })?;

        Ok(FetchedPage {
            url: url.to_owned(),
            status: status.as_u16(),
            body,
        })
    }
}

impl PageSource for Fetcher {
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetch(url).await
    }
}
