//! The reasoning service boundary.

use std::sync::Arc;

use async_trait::async_trait;
use iralens_core::Retryable;
use thiserror::Error;

use crate::schema::ResponseSchema;

#[derive(Error, Debug)]
pub enum ReasoningError {
    #[cfg(feature = "openai")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("reasoning service returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The service answered, but not with a JSON value.
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
}

impl ReasoningError {
    /// A bad answer rather than a failed call. Counted against the schema
    /// budget, never the transient one.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::InvalidJson(_))
    }
}

impl Retryable for ReasoningError {
    fn is_retryable(&self) -> bool {
        match self {
            #[cfg(feature = "openai")]
            Self::Http(err) => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            }
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidJson(_) => false,
        }
    }
}

/// A system + user message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// An external service that answers a prompt with a JSON value shaped by
/// `schema`. One attempt per call; retries and validation are the caller's.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn request(
        &self,
        prompt: &Prompt,
        schema: &ResponseSchema,
    ) -> Result<serde_json::Value, ReasoningError>;
}

#[async_trait]
impl<T: ReasoningService + ?Sized> ReasoningService for Arc<T> {
    async fn request(
        &self,
        prompt: &Prompt,
        schema: &ResponseSchema,
    ) -> Result<serde_json::Value, ReasoningError> {
        (**self).request(prompt, schema).await
    }
}
