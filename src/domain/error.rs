//! Error taxonomy for the ingestion pipeline
//!
//! Row, fetch and persistence failures are isolated per row and converted
//! into counted outcomes at the worker boundary. Only configuration
//! failures abort a batch, since no row can safely complete without the
//! vault or the database.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed row: {0}")]
    Row(String),

    #[error("media fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl IngestError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Fatal errors abort the whole batch; everything else is counted
    /// against the row that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
