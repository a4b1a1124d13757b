//! Wayback Machine client: CDX index queries and archived page fetches.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use iralens_core::config::ArchiveSettings;
use iralens_core::{Capture, SnapshotWindow};
use reqwest::header::CONTENT_TYPE;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::service::{ArchiveError, ArchiveService, FetchedContent};

const CDX_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// HTTP client for the Wayback Machine.
///
/// Requests are spaced by at least `min_request_interval` across all callers
/// sharing this client, which keeps a run inside the archive's rate limits.
pub struct WaybackClient {
    client: reqwest::Client,
    cdx_endpoint: String,
    wayback_base: String,
    capture_limit: u32,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl WaybackClient {
    pub fn new(settings: &ArchiveSettings) -> Result<Self, ArchiveError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            client,
            cdx_endpoint: settings.cdx_endpoint.clone(),
            wayback_base: settings.wayback_base.trim_end_matches('/').to_string(),
            capture_limit: settings.capture_limit,
            min_interval: settings.min_request_interval(),
            last_request: Mutex::new(None),
        })
    }

    /// Archived-copy URL for a capture.
    pub fn locator(&self, timestamp: &str, original_url: &str) -> String {
        format!("{}/{}/{}", self.wayback_base, timestamp, original_url)
    }

    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response, ArchiveError> {
        self.pace().await;
        let resp = self.client.get(url).query(query).send().await?;
        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(ArchiveError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ArchiveError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    fn parse_cdx(&self, body: &str, path: &str) -> Result<Vec<Capture>, ArchiveError> {
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<Vec<String>> = serde_json::from_str(body)
            .map_err(|e| ArchiveError::Malformed(format!("CDX body is not a JSON table: {e}")))?;
        let Some((header, data)) = rows.split_first() else {
            return Ok(Vec::new());
        };

        let column = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ArchiveError::Malformed(format!("CDX header lacks '{name}'")))
        };
        let ts_idx = column("timestamp")?;
        let url_idx = column("original")?;

        let mut captures = Vec::with_capacity(data.len());
        for row in data {
            let (Some(ts), Some(original)) = (row.get(ts_idx), row.get(url_idx)) else {
                debug!(?row, "skipping short CDX row");
                continue;
            };
            let Ok(timestamp) = NaiveDateTime::parse_from_str(ts, CDX_TIMESTAMP_FORMAT) else {
                debug!(timestamp = %ts, "skipping CDX row with unparseable timestamp");
                continue;
            };
            captures.push(Capture {
                timestamp,
                original_url: original.clone(),
                locator: self.locator(ts, original),
                path: path.to_string(),
            });
        }
        Ok(captures)
    }
}

#[async_trait]
impl ArchiveService for WaybackClient {
    async fn list_captures(
        &self,
        domain: &str,
        path: &str,
        window: &SnapshotWindow,
    ) -> Result<Vec<Capture>, ArchiveError> {
        let target = format!("{domain}{path}");
        // Ranked by distance to the anchor, so `limit` trims the far end of
        // the year rather than whatever the index lists last.
        let query = [
            ("url", target.clone()),
            ("output", "json".to_string()),
            ("from", window.start().format("%Y%m%d").to_string()),
            ("to", window.end().format("%Y%m%d").to_string()),
            ("filter", "statuscode:200".to_string()),
            ("fl", "timestamp,original,mimetype".to_string()),
            ("closest", window.anchor_time().format(CDX_TIMESTAMP_FORMAT).to_string()),
            ("sort", "closest".to_string()),
            ("limit", self.capture_limit.to_string()),
        ];

        debug!(url = %target, window = %window.label, "querying CDX index");
        let resp = self.get(&self.cdx_endpoint, &query).await?;
        let body = resp.text().await?;
        let captures = self.parse_cdx(&body, path)?;
        debug!(url = %target, count = captures.len(), "CDX captures");
        Ok(captures)
    }

    async fn fetch(&self, locator: &str) -> Result<FetchedContent, ArchiveError> {
        debug!(locator, "fetching archived capture");
        let resp = self.get(locator, &[]).await?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());
        let body = resp.bytes().await?.to_vec();
        Ok(FetchedContent { content_type, body })
    }
}
