use thiserror::Error;

use crate::mapper::ImportSummary;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is not an image (content type {content_type})")]
    NotAnImage { url: String, content_type: String },

    #[error("catalog rejected \"{name}\": {source}")]
    Catalog {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("record store operation failed: {0}")]
    Store(#[source] BoxError),

    #[error("{} catalog products created but not flagged as imported: {source}", .ids.len())]
    MarkImported {
        summary: ImportSummary,
        ids: Vec<i64>,
        #[source]
        source: BoxError,
    },
}

impl ImportError {
    /// Summary of a batch that ran to completion before the error.
    #[must_use]
    pub fn summary(&self) -> Option<&ImportSummary> {
        match self {
            Self::MarkImported { summary, .. } => Some(summary),
            _ => None,
        }
    }

    pub(crate) fn catalog<E>(name: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Catalog {
            name: name.to_owned(),
            source: Box::new(source),
        }
    }
}
