//! The archive service boundary.

use std::sync::Arc;

use async_trait::async_trait;
use iralens_core::{Capture, Retryable, SnapshotWindow};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[cfg(feature = "wayback")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("archive returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("not found in archive: {0}")]
    NotFound(String),
    #[error("malformed archive response: {0}")]
    Malformed(String),
}

impl Retryable for ArchiveError {
    fn is_retryable(&self) -> bool {
        match self {
            #[cfg(feature = "wayback")]
            Self::Http(err) => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            }
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound(_) | Self::Malformed(_) => false,
        }
    }
}

/// Raw archived payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedContent {
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: Some("text/html; charset=utf-8".into()),
            body: body.into(),
        }
    }
}

/// Read access to a web archive.
///
/// Implementations perform a single attempt per call; retries are the
/// caller's business (see [`iralens_core::RetryPolicy`]).
#[async_trait]
pub trait ArchiveService: Send + Sync {
    /// All captures of `domain + path` the index reports for the window's year.
    async fn list_captures(
        &self,
        domain: &str,
        path: &str,
        window: &SnapshotWindow,
    ) -> Result<Vec<Capture>, ArchiveError>;

    /// Raw content of one archived capture.
    async fn fetch(&self, locator: &str) -> Result<FetchedContent, ArchiveError>;
}

#[async_trait]
impl<T: ArchiveService + ?Sized> ArchiveService for Arc<T> {
    async fn list_captures(
        &self,
        domain: &str,
        path: &str,
        window: &SnapshotWindow,
    ) -> Result<Vec<Capture>, ArchiveError> {
        (**self).list_captures(domain, path, window).await
    }

    async fn fetch(&self, locator: &str) -> Result<FetchedContent, ArchiveError> {
        (**self).fetch(locator).await
    }
}
