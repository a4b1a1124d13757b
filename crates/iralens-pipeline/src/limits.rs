//! Per-service concurrency caps.

use std::sync::Arc;

use async_trait::async_trait;
use iralens_ai::{Prompt, ReasoningError, ReasoningService, ResponseSchema};
use iralens_archive::{ArchiveError, ArchiveService, FetchedContent};
use iralens_core::{Capture, SnapshotWindow};
use serde_json::Value;
use tokio::sync::Semaphore;

/// Archive service wrapper allowing at most `max_concurrent` calls in flight.
pub struct LimitedArchive<A> {
    inner: A,
    permits: Arc<Semaphore>,
}

impl<A> LimitedArchive<A> {
    pub fn new(inner: A, max_concurrent: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl<A: ArchiveService> ArchiveService for LimitedArchive<A> {
    async fn list_captures(
        &self,
        domain: &str,
        path: &str,
        window: &SnapshotWindow,
    ) -> Result<Vec<Capture>, ArchiveError> {
        // The semaphore is never closed, so acquisition always yields a permit.
        let _permit = self.permits.acquire().await.ok();
        self.inner.list_captures(domain, path, window).await
    }

    async fn fetch(&self, locator: &str) -> Result<FetchedContent, ArchiveError> {
        let _permit = self.permits.acquire().await.ok();
        self.inner.fetch(locator).await
    }
}

/// Reasoning service wrapper allowing at most `max_concurrent` requests in flight.
pub struct LimitedReasoning<R> {
    inner: R,
    permits: Arc<Semaphore>,
}

impl<R> LimitedReasoning<R> {
    pub fn new(inner: R, max_concurrent: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl<R: ReasoningService> ReasoningService for LimitedReasoning<R> {
    async fn request(
        &self,
        prompt: &Prompt,
        schema: &ResponseSchema,
    ) -> Result<Value, ReasoningError> {
        let _permit = self.permits.acquire().await.ok();
        self.inner.request(prompt, schema).await
    }
}
