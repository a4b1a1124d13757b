//! Per-company state machine and the bounded worker pool that runs it.

use std::sync::Arc;

use futures::StreamExt;
use iralens_ai::{HierarchicalAnalyzer, ReasoningService};
use iralens_archive::{ArchiveService, ContentExtractor, SnapshotResolver};
use iralens_core::{
    AnalysisConfig, Company, CompanyState, InvalidTransition, Outcome, ResultRow, RunStatus,
    SnapshotResult, SnapshotWindow,
};
use iralens_store::ResultSink;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::attrition::{AttritionCounters, AttritionCounts};
use crate::limits::{LimitedArchive, LimitedReasoning};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Companies handed to the run.
    pub submitted: usize,
    /// Companies that reached a terminal state.
    pub processed: usize,
    pub counts: AttritionCounts,
    /// Dispatch stopped early because of cancellation.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn not_dispatched(&self) -> usize {
        self.submitted - self.processed
    }

    /// `completed + insufficient + extraction_failed + analysis_error == processed`.
    pub fn identity_holds(&self) -> bool {
        self.counts.total() == self.processed as u64
    }
}

pub struct Orchestrator<A, R> {
    resolver: SnapshotResolver<Arc<LimitedArchive<A>>>,
    extractor: ContentExtractor<Arc<LimitedArchive<A>>>,
    analyzer: HierarchicalAnalyzer<LimitedReasoning<R>>,
    pre_window: SnapshotWindow,
    post_window: SnapshotWindow,
    workers: usize,
    sink: Arc<ResultSink>,
}

impl<A: ArchiveService, R: ReasoningService> Orchestrator<A, R> {
    /// Wire the services into a run. Each service gets its own concurrency cap
    /// from `config`; both share the transient retry policy.
    pub fn new(archive: A, reasoning: R, config: &AnalysisConfig) -> Self {
        let policy = config.retry.policy();
        let archive = Arc::new(LimitedArchive::new(archive, config.archive.max_concurrent));
        let reasoning = LimitedReasoning::new(reasoning, config.reasoning.max_concurrent);

        Self {
            resolver: SnapshotResolver::new(archive.clone(), policy.clone()),
            extractor: ContentExtractor::new(archive, policy.clone(), config.extraction.content_limit),
            analyzer: HierarchicalAnalyzer::new(reasoning, policy)
                .with_schema_attempts(config.reasoning.schema_attempts)
                .with_prompt_limit(config.extraction.prompt_limit),
            pre_window: config.pre_window.clone(),
            post_window: config.post_window.clone(),
            workers: config.workers.max(1),
            sink: Arc::new(ResultSink::new()),
        }
    }

    /// Append rows to `sink` instead of a private one, so the caller can
    /// flush them however the run ends.
    pub fn with_sink(mut self, sink: Arc<ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Rows of every company this orchestrator has finished, across runs.
    pub fn sink(&self) -> &Arc<ResultSink> {
        &self.sink
    }

    /// Run one company to its terminal state, append its row to the sink, and
    /// return it.
    pub async fn process(&self, company: &Company) -> Result<ResultRow, InvalidTransition> {
        self.process_counted(company, &AttritionCounters::default()).await
    }

    async fn process_counted(
        &self,
        company: &Company,
        counters: &AttritionCounters,
    ) -> Result<ResultRow, InvalidTransition> {
        let outcome = self.drive(company).await?;
        let status = outcome.status();
        let row = ResultRow::from_outcome(company, &outcome);

        counters.record(status);
        self.sink.push(row.clone());
        info!(company = %company.name, domain = %company.domain, %status, "company finished");
        Ok(row)
    }

    async fn drive(&self, company: &Company) -> Result<Outcome, InvalidTransition> {
        let state = CompanyState::Pending.advance(CompanyState::ResolvingSnapshots)?;

        let (pre, post) = tokio::join!(
            self.resolver.resolve(&company.domain, &company.paths, &self.pre_window),
            self.resolver.resolve(&company.domain, &company.paths, &self.post_window),
        );
        let (pre, post) = match (pre, post) {
            (SnapshotResult::Found(pre), SnapshotResult::Found(post)) => (pre, post),
            (pre, post) => {
                state.advance(CompanyState::Terminal(RunStatus::InsufficientSnapshots))?;
                return Ok(Outcome::InsufficientSnapshots { pre, post });
            }
        };

        let state = state.advance(CompanyState::Extracting)?;
        let (pre_content, post_content) =
            tokio::join!(self.extractor.extract(&pre), self.extractor.extract(&post));
        if !pre_content.is_success() || !post_content.is_success() {
            state.advance(CompanyState::Terminal(RunStatus::ContentExtractionFailed))?;
            return Ok(Outcome::ContentExtractionFailed {
                pre,
                post,
                pre_content,
                post_content,
            });
        }

        let state = state.advance(CompanyState::Analyzing)?;
        match self.analyzer.assess(pre_content.text(), post_content.text()).await {
            Ok(assessment) => {
                state.advance(CompanyState::Terminal(RunStatus::Completed))?;
                Ok(Outcome::Completed {
                    pre,
                    post,
                    pre_content,
                    post_content,
                    assessment: Box::new(assessment),
                })
            }
            Err(err) => {
                warn!(company = %company.name, stage = err.stage(), error = %err, "analysis failed");
                state.advance(CompanyState::Terminal(RunStatus::AnalysisError))?;
                Ok(Outcome::AnalysisError {
                    pre,
                    post,
                    pre_content,
                    post_content,
                    error: err.to_string(),
                })
            }
        }
    }

    /// Process `companies` with at most `workers` in flight.
    ///
    /// Once `cancel` fires no further company is dispatched; companies already
    /// in flight run to their terminal state and are recorded. The summary
    /// counts only this run's companies.
    pub async fn run(
        &self,
        companies: Vec<Company>,
        cancel: CancellationToken,
    ) -> Result<RunSummary, InvalidTransition> {
        let submitted = companies.len();
        info!(companies = submitted, workers = self.workers, "run started");
        let counters = AttritionCounters::default();

        let results: Vec<Result<ResultRow, InvalidTransition>> = futures::stream::iter(companies)
            .take_until(cancel.clone().cancelled_owned())
            .map(|company| {
                let counters = &counters;
                async move { self.process_counted(&company, counters).await }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let processed = results.into_iter().collect::<Result<Vec<_>, _>>()?.len();
        let summary = RunSummary {
            submitted,
            processed,
            counts: counters.snapshot(),
            cancelled: cancel.is_cancelled() && processed < submitted,
        };

        if summary.cancelled {
            warn!(
                processed,
                not_dispatched = summary.not_dispatched(),
                "run cancelled; remaining companies were not dispatched"
            );
        }
        info!(
            processed,
            completed = summary.counts.completed,
            insufficient_snapshots = summary.counts.insufficient_snapshots,
            content_extraction_failed = summary.counts.content_extraction_failed,
            analysis_error = summary.counts.analysis_error,
            "run finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use iralens_ai::{Prompt, ReasoningError, ResponseSchema};
    use iralens_archive::{ArchiveError, FetchedContent};
    use iralens_core::config::RetrySettings;
    use iralens_core::Capture;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// Index keyed by `domain + path`; fetch serves pages by locator.
    #[derive(Default)]
    struct StubArchive {
        index: HashMap<String, Vec<NaiveDateTime>>,
        pages: HashMap<String, FetchedContent>,
        cancel_on_first_call: Option<CancellationToken>,
        list_calls: Mutex<u32>,
    }

    fn locator(domain: &str, path: &str, at: NaiveDateTime) -> String {
        format!("wb/{}/{domain}{path}", at.format("%Y%m%d%H%M%S"))
    }

    impl StubArchive {
        fn with_captures(mut self, domain: &str, path: &str, at: &[NaiveDateTime]) -> Self {
            self.index.insert(format!("{domain}{path}"), at.to_vec());
            self
        }

        fn with_page(mut self, domain: &str, path: &str, at: NaiveDateTime, content: FetchedContent) -> Self {
            self.pages.insert(locator(domain, path, at), content);
            self
        }
    }

    #[async_trait]
    impl ArchiveService for StubArchive {
        async fn list_captures(
            &self,
            domain: &str,
            path: &str,
            _window: &SnapshotWindow,
        ) -> Result<Vec<Capture>, ArchiveError> {
            {
                let mut calls = self.list_calls.lock().unwrap();
                *calls += 1;
                if *calls == 1
                    && let Some(token) = &self.cancel_on_first_call
                {
                    token.cancel();
                }
            }
            let stamps = self.index.get(&format!("{domain}{path}")).cloned().unwrap_or_default();
            Ok(stamps
                .into_iter()
                .map(|at| Capture {
                    timestamp: at,
                    original_url: format!("https://{domain}{path}"),
                    locator: locator(domain, path, at),
                    path: path.to_string(),
                })
                .collect())
        }

        async fn fetch(&self, locator: &str) -> Result<FetchedContent, ArchiveError> {
            Ok(self.pages.get(locator).cloned().unwrap_or_else(|| {
                FetchedContent::html(format!(
                    "<html><body><nav>menu</nav><p>Archived copy {locator} of a clean energy company.</p></body></html>"
                ))
            }))
        }
    }

    /// Conforming answers for every schema, except that the lexical answer can
    /// be made to drop its required flag.
    #[derive(Default)]
    struct StubReasoning {
        omit_lexical_flag: bool,
    }

    #[async_trait]
    impl ReasoningService for StubReasoning {
        async fn request(&self, _prompt: &Prompt, schema: &ResponseSchema) -> Result<Value, ReasoningError> {
            Ok(match schema.name {
                "lexical_assessment" if self.omit_lexical_flag => {
                    json!({"lexical_summary": "flag forgotten"})
                }
                "lexical_assessment" => {
                    json!({"lexical_has_changed": true, "lexical_summary": "New IRA vocabulary."})
                }
                "framing_assessment" => json!({
                    "framing_has_changed": true,
                    "framing_from_narrative": "Equipment vendor",
                    "framing_to_narrative": "Decarbonization partner",
                    "framing_summary": "Shift toward climate mission."
                }),
                "audience_assessment" => json!({
                    "audience_has_changed": false,
                    "audience_primary_audience": "Utilities",
                    "audience_summary": "No significant change"
                }),
                "ira_alignment_assessment" => json!({
                    "ira_alignment_detected": true,
                    "ira_evidence_type": "conceptual_language",
                    "ira_specific_evidence": [],
                    "ira_reasoning": "Talks about domestic manufacturing incentives."
                }),
                _ => json!({
                    "overall_change_level": "moderate",
                    "overall_confidence": 0.7,
                    "overall_synthesis_reasoning": "Framing moved, audience stable."
                }),
            })
        }
    }

    fn config(workers: usize) -> AnalysisConfig {
        AnalysisConfig {
            workers,
            retry: RetrySettings {
                max_attempts: 3,
                base_delay_ms: 0,
                multiplier: 1.0,
                max_delay_ms: 0,
                jitter: 0.0,
            },
            ..AnalysisConfig::default()
        }
    }

    fn company(domain: &str, paths: &[&str]) -> Company {
        Company::new(
            domain.split('.').next().unwrap_or(domain),
            domain,
            paths.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn windows_resolve_paths_independently() {
        let archive = StubArchive::default()
            .with_captures("acme.com", "/about", &[ts(2021, 5, 1), ts(2023, 2, 1)])
            .with_captures("acme.com", "/sustainability", &[ts(2022, 6, 15), ts(2023, 7, 1)]);
        let orchestrator = Orchestrator::new(archive, StubReasoning::default(), &config(2));

        // /about has a 2023 capture, so the post window stops there.
        let row = orchestrator
            .process(&company("acme.com", &["/about", "/sustainability"]))
            .await
            .unwrap();
        assert_eq!(row.status, "completed");
        assert_eq!(row.pre_snapshot_path.as_deref(), Some("/sustainability"));
        assert_eq!(row.pre_snapshot_timestamp.as_deref(), Some("20220615000000"));
        assert_eq!(row.post_snapshot_path.as_deref(), Some("/about"));
        assert!(row.pre_word_count.unwrap() > 0);
        assert!(row.post_word_count.unwrap() > 0);
        assert_eq!(row.overall_change_level.as_deref(), Some("moderate"));
    }

    #[tokio::test]
    async fn sustainability_selected_when_about_has_no_captures_in_either_year() {
        let archive = StubArchive::default()
            .with_captures("acme.com", "/about", &[ts(2021, 5, 1)])
            .with_captures("acme.com", "/sustainability", &[ts(2022, 6, 15), ts(2023, 7, 1)]);
        let orchestrator = Orchestrator::new(archive, StubReasoning::default(), &config(2));

        let row = orchestrator
            .process(&company("acme.com", &["/about", "/sustainability"]))
            .await
            .unwrap();
        assert_eq!(row.status, "completed");
        assert_eq!(row.pre_snapshot_path.as_deref(), Some("/sustainability"));
        assert_eq!(row.post_snapshot_path.as_deref(), Some("/sustainability"));
        assert_eq!(row.post_snapshot_timestamp.as_deref(), Some("20230701000000"));
        assert!(row.pre_word_count.unwrap() > 0 && row.post_word_count.unwrap() > 0);
    }

    #[tokio::test]
    async fn missing_window_is_insufficient_snapshots() {
        let archive = StubArchive::default().with_captures("acme.com", "/", &[ts(2022, 7, 2)]);
        let orchestrator = Orchestrator::new(archive, StubReasoning::default(), &config(1));

        let row = orchestrator.process(&company("acme.com", &["/"])).await.unwrap();
        assert_eq!(row.status, "insufficient_snapshots");
        assert!(row.pre_snapshot_url.is_some());
        assert_eq!(
            row.post_snapshot_error.as_deref(),
            Some("no capture in 2023 for any candidate path")
        );
        assert!(row.pre_word_count.is_none());
        assert!(row.has_no_assessment_fields());
    }

    #[tokio::test]
    async fn one_bad_side_is_content_extraction_failed() {
        let post_at = ts(2023, 7, 1);
        let archive = StubArchive::default()
            .with_captures("acme.com", "/", &[ts(2022, 7, 1), post_at])
            .with_page(
                "acme.com",
                "/",
                post_at,
                FetchedContent {
                    content_type: Some("application/pdf".into()),
                    body: b"%PDF-1.7".to_vec(),
                },
            );
        let orchestrator = Orchestrator::new(archive, StubReasoning::default(), &config(1));

        let row = orchestrator.process(&company("acme.com", &["/"])).await.unwrap();
        assert_eq!(row.status, "content_extraction_failed");
        // The healthy side is still extracted.
        assert!(row.pre_word_count.unwrap() > 0);
        assert!(row.post_word_count.is_none());
        assert_eq!(
            row.post_content_error.as_deref(),
            Some("non-text content type: application/pdf")
        );
        assert!(row.has_no_assessment_fields());
    }

    #[tokio::test]
    async fn schema_exhaustion_is_analysis_error_without_assessment_fields() {
        let archive = StubArchive::default().with_captures("acme.com", "/", &[ts(2022, 7, 1), ts(2023, 7, 1)]);
        let reasoning = StubReasoning {
            omit_lexical_flag: true,
        };
        let orchestrator = Orchestrator::new(archive, reasoning, &config(1));

        let row = orchestrator.process(&company("acme.com", &["/"])).await.unwrap();
        assert_eq!(row.status, "analysis_error");
        assert!(row.has_no_assessment_fields());
        let message = row.error_message.unwrap();
        assert!(message.starts_with("lexical"), "{message}");
        assert!(message.contains("3 attempts"), "{message}");
        assert!(row.pre_word_count.unwrap() > 0);
    }

    #[tokio::test]
    async fn every_company_lands_in_exactly_one_status() {
        let archive = StubArchive::default()
            .with_captures("good.com", "/", &[ts(2022, 7, 1), ts(2023, 7, 1)])
            .with_captures("good2.com", "/about", &[ts(2022, 3, 1), ts(2023, 9, 1)])
            .with_captures("half.com", "/", &[ts(2022, 7, 1)])
            .with_captures("pdf.com", "/", &[ts(2022, 7, 1), ts(2023, 7, 1)])
            .with_page(
                "pdf.com",
                "/",
                ts(2022, 7, 1),
                FetchedContent {
                    content_type: Some("application/pdf".into()),
                    body: b"%PDF".to_vec(),
                },
            );
        let orchestrator = Orchestrator::new(archive, StubReasoning::default(), &config(3));
        let companies = vec![
            company("good.com", &["/"]),
            company("good2.com", &["/", "/about"]),
            company("half.com", &["/"]),
            company("none.com", &["/", "/about"]),
            company("pdf.com", &["/"]),
        ];

        let summary = orchestrator
            .run(companies, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.submitted, 5);
        assert_eq!(summary.processed, 5);
        assert!(!summary.cancelled);
        assert!(summary.identity_holds());
        assert_eq!(summary.counts.completed, 2);
        assert_eq!(summary.counts.insufficient_snapshots, 2);
        assert_eq!(summary.counts.content_extraction_failed, 1);
        assert_eq!(summary.counts.analysis_error, 0);
        assert_eq!(orchestrator.sink().len(), 5);
    }

    #[tokio::test]
    async fn cancelled_before_start_dispatches_nothing() {
        let orchestrator = Orchestrator::new(StubArchive::default(), StubReasoning::default(), &config(2));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = orchestrator
            .run(vec![company("a.com", &["/"]), company("b.com", &["/"])], cancel)
            .await
            .unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.not_dispatched(), 2);
        assert!(summary.cancelled);
        assert!(orchestrator.sink().is_empty());
    }

    #[tokio::test]
    async fn cancellation_lets_in_flight_company_finish() {
        let cancel = CancellationToken::new();
        let archive = StubArchive {
            cancel_on_first_call: Some(cancel.clone()),
            ..StubArchive::default()
        }
        .with_captures("a.com", "/", &[ts(2022, 7, 1), ts(2023, 7, 1)]);
        let orchestrator = Orchestrator::new(archive, StubReasoning::default(), &config(1));
        let sink = Arc::new(ResultSink::new());
        let orchestrator = orchestrator.with_sink(sink.clone());

        let summary = orchestrator
            .run(
                vec![
                    company("a.com", &["/"]),
                    company("b.com", &["/"]),
                    company("c.com", &["/"]),
                ],
                cancel,
            )
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed, 1);
        assert!(summary.identity_holds());
        let rows = sink.snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].domain, "a.com");
        assert_eq!(rows[0].status, "completed");
    }

    #[tokio::test]
    async fn each_run_counts_only_its_own_companies() {
        let archive = StubArchive::default()
            .with_captures("a.com", "/", &[ts(2022, 7, 1), ts(2023, 7, 1)])
            .with_captures("b.com", "/", &[ts(2022, 7, 1)]);
        let orchestrator = Orchestrator::new(archive, StubReasoning::default(), &config(1));

        let first = orchestrator
            .run(vec![company("a.com", &["/"])], CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first.processed, 1);
        assert!(first.identity_holds());

        let second = orchestrator
            .run(vec![company("b.com", &["/"])], CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(second.processed, 1);
        assert_eq!(second.counts.total(), 1);
        assert_eq!(second.counts.completed, 0);
        assert_eq!(second.counts.insufficient_snapshots, 1);
        assert!(second.identity_holds());

        // The sink is append-only and keeps both runs' rows.
        assert_eq!(orchestrator.sink().len(), 2);
    }
}
