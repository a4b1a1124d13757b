//! Snapshot resolution: pick one capture per (company, window).

use iralens_core::{Capture, RetryPolicy, SnapshotResult, SnapshotWindow};
use tracing::{debug, info, warn};

use crate::service::ArchiveService;

/// Picks the in-window capture closest to the window's anchor.
///
/// Captures outside the window's year are discarded first. Ties in distance
/// go to the earlier capture.
pub fn select_closest(captures: Vec<Capture>, window: &SnapshotWindow) -> Option<Capture> {
    let anchor = window.anchor_time();
    captures
        .into_iter()
        .filter(|c| window.contains(&c.timestamp))
        .min_by_key(|c| ((c.timestamp - anchor).num_seconds().abs(), c.timestamp))
}

pub struct SnapshotResolver<A> {
    archive: A,
    policy: RetryPolicy,
}

impl<A: ArchiveService> SnapshotResolver<A> {
    pub fn new(archive: A, policy: RetryPolicy) -> Self {
        Self { archive, policy }
    }

    /// Walk `paths` in order and return the first path's best capture.
    ///
    /// A path whose index query fails (terminally or after the retry budget)
    /// counts as having no capture; the failure is kept for the reason string.
    pub async fn resolve(&self, domain: &str, paths: &[String], window: &SnapshotWindow) -> SnapshotResult {
        let mut last_failure: Option<String> = None;

        for path in paths {
            let listed = self
                .policy
                .run("list_captures", || self.archive.list_captures(domain, path, window))
                .await;

            let captures = match listed {
                Ok(captures) => captures,
                Err(err) => {
                    warn!(domain, path = %path, window = %window.label, error = %err, "capture listing failed, trying next path");
                    last_failure = Some(format!("{path}: {err}"));
                    continue;
                }
            };

            let listed_count = captures.len();
            match select_closest(captures, window) {
                Some(capture) => {
                    info!(
                        domain,
                        path = %path,
                        window = %window.label,
                        timestamp = %capture.timestamp,
                        "snapshot selected"
                    );
                    return SnapshotResult::Found(capture);
                }
                None => {
                    debug!(domain, path = %path, window = %window.label, listed_count, "no in-window capture");
                }
            }
        }

        let mut reason = format!("no capture in {} for any candidate path", window.year);
        if let Some(failure) = last_failure {
            reason.push_str(&format!(" (last error: {failure})"));
        }
        info!(domain, window = %window.label, reason = %reason, "snapshot unavailable");
        SnapshotResult::Unavailable { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ArchiveError, FetchedContent};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn capture(path: &str, at: NaiveDateTime) -> Capture {
        Capture {
            timestamp: at,
            original_url: format!("https://acme.com{path}"),
            locator: format!("wb/{}/acme.com{path}", at.format("%Y%m%d%H%M%S")),
            path: path.to_string(),
        }
    }

    enum Scripted {
        Captures(Vec<Capture>),
        Fail(u16),
    }

    /// Archive stub keyed by path. It ignores the window, like an index that
    /// over-reports.
    struct StubArchive {
        by_path: HashMap<String, Scripted>,
        calls: Mutex<Vec<String>>,
    }

    impl StubArchive {
        fn new(entries: Vec<(&str, Scripted)>) -> Self {
            Self {
                by_path: entries
                    .into_iter()
                    .map(|(p, s)| (p.to_string(), s))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ArchiveService for StubArchive {
        async fn list_captures(
            &self,
            _domain: &str,
            path: &str,
            _window: &SnapshotWindow,
        ) -> Result<Vec<Capture>, ArchiveError> {
            self.calls.lock().unwrap().push(path.to_string());
            match self.by_path.get(path) {
                Some(Scripted::Captures(c)) => Ok(c.clone()),
                Some(Scripted::Fail(status)) => Err(ArchiveError::Status {
                    status: *status,
                    body: String::new(),
                }),
                None => Ok(Vec::new()),
            }
        }

        async fn fetch(&self, _locator: &str) -> Result<FetchedContent, ArchiveError> {
            unreachable!("resolver never fetches")
        }
    }

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn closest_to_mid_year_wins() {
        let window = SnapshotWindow::new("pre", 2022);
        let picked = select_closest(
            vec![
                capture("/", ts(2022, 1, 5, 0)),
                capture("/", ts(2022, 6, 20, 0)),
                capture("/", ts(2022, 11, 30, 0)),
            ],
            &window,
        )
        .unwrap();
        assert_eq!(picked.timestamp, ts(2022, 6, 20, 0));
    }

    #[test]
    fn ties_go_to_earlier_capture() {
        let window = SnapshotWindow::new("pre", 2022);
        let picked = select_closest(
            vec![
                capture("/", ts(2022, 7, 1, 12)),
                capture("/", ts(2022, 6, 30, 12)),
            ],
            &window,
        )
        .unwrap();
        assert_eq!(picked.timestamp, ts(2022, 6, 30, 12));
    }

    #[test]
    fn out_of_year_captures_are_never_selected() {
        let window = SnapshotWindow::new("pre", 2022);
        // 2023-01-01 is closer to nothing in-year but must still be discarded.
        let picked = select_closest(
            vec![
                capture("/", ts(2021, 7, 1, 0)),
                capture("/", ts(2023, 1, 1, 0)),
            ],
            &window,
        );
        assert!(picked.is_none());
    }

    #[tokio::test]
    async fn falls_through_to_later_path() {
        let archive = StubArchive::new(vec![
            ("/about", Scripted::Captures(vec![capture("/about", ts(2021, 3, 1, 0))])),
            (
                "/sustainability",
                Scripted::Captures(vec![
                    capture("/sustainability", ts(2022, 6, 15, 0)),
                    capture("/sustainability", ts(2023, 7, 1, 0)),
                ]),
            ),
        ]);
        let resolver = SnapshotResolver::new(archive, RetryPolicy::immediate(3));
        let candidates = paths(&["/about", "/sustainability"]);

        let pre = resolver
            .resolve("acme.com", &candidates, &SnapshotWindow::new("pre", 2022))
            .await;
        let post = resolver
            .resolve("acme.com", &candidates, &SnapshotWindow::new("post", 2023))
            .await;

        let pre = pre.capture().unwrap();
        let post = post.capture().unwrap();
        assert_eq!(pre.path, "/sustainability");
        assert_eq!(pre.timestamp, ts(2022, 6, 15, 0));
        assert_eq!(post.path, "/sustainability");
        assert_eq!(post.timestamp, ts(2023, 7, 1, 0));
    }

    #[tokio::test]
    async fn stops_at_first_usable_path() {
        let archive = StubArchive::new(vec![
            ("/", Scripted::Captures(vec![capture("/", ts(2022, 2, 1, 0))])),
            ("/about", Scripted::Captures(vec![capture("/about", ts(2022, 7, 1, 0))])),
        ]);
        let resolver = SnapshotResolver::new(archive, RetryPolicy::immediate(3));
        let result = resolver
            .resolve("acme.com", &paths(&["/", "/about"]), &SnapshotWindow::new("pre", 2022))
            .await;
        assert_eq!(result.capture().unwrap().path, "/");
        assert_eq!(resolver.archive.calls(), vec!["/"]);
    }

    #[tokio::test]
    async fn no_captures_anywhere_is_unavailable() {
        let archive = StubArchive::new(vec![]);
        let resolver = SnapshotResolver::new(archive, RetryPolicy::immediate(3));
        let result = resolver
            .resolve("acme.com", &paths(&["/", "/about"]), &SnapshotWindow::new("pre", 2022))
            .await;
        assert_eq!(
            result.reason(),
            Some("no capture in 2022 for any candidate path")
        );
    }

    #[tokio::test]
    async fn exhausted_retries_advance_to_next_path() {
        let archive = StubArchive::new(vec![
            ("/", Scripted::Fail(503)),
            ("/about", Scripted::Captures(vec![capture("/about", ts(2022, 8, 1, 0))])),
        ]);
        let resolver = SnapshotResolver::new(archive, RetryPolicy::immediate(3));
        let result = resolver
            .resolve("acme.com", &paths(&["/", "/about"]), &SnapshotWindow::new("pre", 2022))
            .await;
        assert_eq!(result.capture().unwrap().path, "/about");
        assert_eq!(resolver.archive.calls(), vec!["/", "/", "/", "/about"]);
    }

    #[tokio::test]
    async fn terminal_failure_is_not_retried_and_is_reported() {
        let archive = StubArchive::new(vec![("/", Scripted::Fail(403))]);
        let resolver = SnapshotResolver::new(archive, RetryPolicy::immediate(3));
        let result = resolver
            .resolve("acme.com", &paths(&["/"]), &SnapshotWindow::new("pre", 2022))
            .await;
        assert_eq!(resolver.archive.calls(), vec!["/"]);
        let reason = result.reason().unwrap();
        assert!(reason.starts_with("no capture in 2022 for any candidate path"));
        assert!(reason.contains("403"), "{reason}");
    }
}
