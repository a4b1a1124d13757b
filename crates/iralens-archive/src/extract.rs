//! Archived page → normalised plain text.

use encoding_rs::{Encoding, UTF_8};
use iralens_core::{Capture, ContentRecord, ExtractionFailure, RetryPolicy};
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::service::{ArchiveService, FetchedContent};

/// Elements whose subtree never contributes page text.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "nav", "header", "footer", "aside", "iframe",
];

/// Wayback toolbar and banner elements carry ids like `wm-ipp-base`.
const ARCHIVE_CHROME_ID: &str = "wm-";

fn is_text_content_type(content_type: &str) -> bool {
    let media = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media.is_empty() || media.starts_with("text/") || media.contains("html") || media.contains("xml")
}

fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Body decoded with the charset its content type declares; UTF-8 otherwise.
fn decode_body(content: &FetchedContent) -> String {
    let encoding = content
        .content_type
        .as_deref()
        .and_then(charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(&content.body);
    text.into_owned()
}

fn skip_element(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    SKIPPED_ELEMENTS.contains(&value.name())
        || value.id().is_some_and(|id| id.contains(ARCHIVE_CHROME_ID))
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child)
            && !skip_element(&child_element)
        {
            collect_text(child_element, out);
        }
    }
}

fn truncate_chars(text: &mut String, limit: usize) {
    if let Some((byte_idx, _)) = text.char_indices().nth(limit) {
        text.truncate(byte_idx);
    }
}

/// Turn one raw archived payload into a [`ContentRecord`].
///
/// Pure function of its inputs, so identical payloads give identical records.
pub fn normalize_content(content: &FetchedContent, content_limit: usize) -> ContentRecord {
    if let Some(content_type) = &content.content_type
        && !is_text_content_type(content_type)
    {
        return ContentRecord::failed(ExtractionFailure::NonTextContent(content_type.clone()));
    }
    if content.body.contains(&0) {
        return ContentRecord::failed(ExtractionFailure::Parse("binary payload".into()));
    }

    let raw = decode_body(content);
    let document = Html::parse_document(&raw);
    let mut collected = String::with_capacity(raw.len() / 4);
    collect_text(document.root_element(), &mut collected);

    let mut text = collected.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&mut text, content_limit);
    ContentRecord::from_text(text.trim_end().to_string())
}

pub struct ContentExtractor<A> {
    archive: A,
    policy: RetryPolicy,
    content_limit: usize,
}

impl<A: ArchiveService> ContentExtractor<A> {
    pub fn new(archive: A, policy: RetryPolicy, content_limit: usize) -> Self {
        Self {
            archive,
            policy,
            content_limit,
        }
    }

    /// Fetch and normalise one capture. Never fails: problems come back as a
    /// failed record.
    pub async fn extract(&self, capture: &Capture) -> ContentRecord {
        let locator = capture.locator.as_str();
        let fetched = self
            .policy
            .run("fetch_capture", || self.archive.fetch(locator))
            .await;

        let record = match fetched {
            Ok(content) => normalize_content(&content, self.content_limit),
            Err(err) => {
                warn!(locator, error = %err, "capture fetch failed");
                return ContentRecord::failed(ExtractionFailure::Fetch(err.to_string()));
            }
        };

        match record.failure() {
            None => debug!(locator, words = record.word_count(), "content extracted"),
            Some(failure) => warn!(locator, error = %failure, "content extraction failed"),
        }
        record
    }
}
