//! Companies, archived captures, and the content extracted from them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A company in the sample.
///
/// `paths` is the ordered list of candidate page paths to probe in the
/// archive; earlier paths win when several have captures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    /// Bare lowercase host, e.g. `acme.com`.
    pub domain: String,
    /// Website string as given by the input, before cleaning.
    pub website: Option<String>,
    pub paths: Vec<String>,
    /// Optional size attribute (employees, revenue) used for attrition analysis.
    pub size: Option<f64>,
}

impl Company {
    pub fn new(name: impl Into<String>, domain: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            website: None,
            paths,
            size: None,
        }
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }
}

/// One archived, timestamped copy of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    /// Capture time as recorded by the archive (UTC).
    pub timestamp: NaiveDateTime,
    /// URL the archive crawled, e.g. `https://acme.com/about`.
    pub original_url: String,
    /// Where the archived copy can be fetched.
    pub locator: String,
    /// Candidate path that produced this capture.
    pub path: String,
}

/// Outcome of snapshot resolution for one (company, window) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotResult {
    Found(Capture),
    Unavailable { reason: String },
}

impl SnapshotResult {
    pub fn capture(&self) -> Option<&Capture> {
        match self {
            Self::Found(capture) => Some(capture),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Found(_) => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }
}

/// Why extraction produced no usable text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("non-text content type: {0}")]
    NonTextContent(String),
    #[error("could not parse content: {0}")]
    Parse(String),
    #[error("no text content after normalisation")]
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    Success,
    Failed(ExtractionFailure),
}

/// Normalised text extracted from exactly one capture.
///
/// A successful record always has a non-zero word count: [`ContentRecord::from_text`]
/// turns empty text into [`ExtractionFailure::EmptyText`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    text: String,
    word_count: usize,
    status: ExtractionStatus,
}

impl ContentRecord {
    /// Build a record from already-normalised text.
    pub fn from_text(text: String) -> Self {
        let word_count = text.split_whitespace().count();
        if word_count == 0 {
            return Self::failed(ExtractionFailure::EmptyText);
        }
        Self {
            text,
            word_count,
            status: ExtractionStatus::Success,
        }
    }

    pub fn failed(failure: ExtractionFailure) -> Self {
        Self {
            text: String::new(),
            word_count: 0,
            status: ExtractionStatus::Failed(failure),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn status(&self) -> &ExtractionStatus {
        &self.status
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ExtractionStatus::Success)
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        match &self.status {
            ExtractionStatus::Success => None,
            ExtractionStatus::Failed(failure) => Some(failure),
        }
    }
}
