//! Per-company outcomes and the flattened result row.

use serde::{Deserialize, Serialize};

use crate::assessment::Assessment;
use crate::company::{Capture, Company, ContentRecord, SnapshotResult};
use crate::state::RunStatus;

/// Everything a company accumulated before reaching its terminal state.
///
/// Each variant only holds what exists at that point of the pipeline, so a
/// row built from it cannot carry fields its status does not allow.
#[derive(Debug, Clone)]
pub enum Outcome {
    InsufficientSnapshots {
        pre: SnapshotResult,
        post: SnapshotResult,
    },
    ContentExtractionFailed {
        pre: Capture,
        post: Capture,
        pre_content: ContentRecord,
        post_content: ContentRecord,
    },
    AnalysisError {
        pre: Capture,
        post: Capture,
        pre_content: ContentRecord,
        post_content: ContentRecord,
        error: String,
    },
    Completed {
        pre: Capture,
        post: Capture,
        pre_content: ContentRecord,
        post_content: ContentRecord,
        assessment: Box<Assessment>,
    },
}

impl Outcome {
    pub fn status(&self) -> RunStatus {
        match self {
            Self::InsufficientSnapshots { .. } => RunStatus::InsufficientSnapshots,
            Self::ContentExtractionFailed { .. } => RunStatus::ContentExtractionFailed,
            Self::AnalysisError { .. } => RunStatus::AnalysisError,
            Self::Completed { .. } => RunStatus::Completed,
        }
    }
}

/// One flattened output row per company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub company_name: String,
    pub domain: String,
    pub website: Option<String>,
    pub company_size: Option<f64>,
    pub status: String,

    pub pre_snapshot_url: Option<String>,
    pub post_snapshot_url: Option<String>,
    pub pre_snapshot_timestamp: Option<String>,
    pub post_snapshot_timestamp: Option<String>,
    pub pre_snapshot_path: Option<String>,
    pub post_snapshot_path: Option<String>,
    pub pre_snapshot_error: Option<String>,
    pub post_snapshot_error: Option<String>,

    pub pre_word_count: Option<u64>,
    pub post_word_count: Option<u64>,
    pub pre_content_error: Option<String>,
    pub post_content_error: Option<String>,

    pub lexical_has_changed: Option<bool>,
    pub lexical_summary: Option<String>,
    pub framing_has_changed: Option<bool>,
    pub framing_from_narrative: Option<String>,
    pub framing_to_narrative: Option<String>,
    pub framing_summary: Option<String>,
    pub audience_has_changed: Option<bool>,
    pub audience_primary_audience: Option<String>,
    pub audience_summary: Option<String>,
    pub ira_alignment_detected: Option<bool>,
    pub ira_evidence_type: Option<String>,
    /// Evidence terms joined with `"; "`.
    pub ira_specific_evidence: Option<String>,
    pub ira_reasoning: Option<String>,

    pub overall_change_level: Option<String>,
    pub overall_confidence: Option<f64>,
    pub overall_synthesis_reasoning: Option<String>,

    pub error_message: Option<String>,
}

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

impl ResultRow {
    pub fn from_outcome(company: &Company, outcome: &Outcome) -> Self {
        let mut row = Self {
            company_name: company.name.clone(),
            domain: company.domain.clone(),
            website: company.website.clone(),
            company_size: company.size,
            status: outcome.status().as_str().to_string(),
            ..Self::default()
        };

        match outcome {
            Outcome::InsufficientSnapshots { pre, post } => {
                if let Some(capture) = pre.capture() {
                    row.set_pre_capture(capture);
                }
                if let Some(capture) = post.capture() {
                    row.set_post_capture(capture);
                }
                row.pre_snapshot_error = pre.reason().map(str::to_string);
                row.post_snapshot_error = post.reason().map(str::to_string);
            }
            Outcome::ContentExtractionFailed {
                pre,
                post,
                pre_content,
                post_content,
            } => {
                row.set_pre_capture(pre);
                row.set_post_capture(post);
                row.set_content(pre_content, post_content);
            }
            Outcome::AnalysisError {
                pre,
                post,
                pre_content,
                post_content,
                error,
            } => {
                row.set_pre_capture(pre);
                row.set_post_capture(post);
                row.set_content(pre_content, post_content);
                row.error_message = Some(error.clone());
            }
            Outcome::Completed {
                pre,
                post,
                pre_content,
                post_content,
                assessment,
            } => {
                row.set_pre_capture(pre);
                row.set_post_capture(post);
                row.set_content(pre_content, post_content);
                row.set_assessment(assessment);
            }
        }
        row
    }

    pub fn run_status(&self) -> Option<RunStatus> {
        RunStatus::parse(&self.status)
    }

    fn set_pre_capture(&mut self, capture: &Capture) {
        self.pre_snapshot_url = Some(capture.locator.clone());
        self.pre_snapshot_timestamp = Some(capture.timestamp.format(TIMESTAMP_FORMAT).to_string());
        self.pre_snapshot_path = Some(capture.path.clone());
    }

    fn set_post_capture(&mut self, capture: &Capture) {
        self.post_snapshot_url = Some(capture.locator.clone());
        self.post_snapshot_timestamp =
            Some(capture.timestamp.format(TIMESTAMP_FORMAT).to_string());
        self.post_snapshot_path = Some(capture.path.clone());
    }

    fn set_content(&mut self, pre: &ContentRecord, post: &ContentRecord) {
        if pre.is_success() {
            self.pre_word_count = Some(pre.word_count() as u64);
        }
        if post.is_success() {
            self.post_word_count = Some(post.word_count() as u64);
        }
        self.pre_content_error = pre.failure().map(ToString::to_string);
        self.post_content_error = post.failure().map(ToString::to_string);
    }

    fn set_assessment(&mut self, assessment: &Assessment) {
        let lexical = &assessment.lexical;
        self.lexical_has_changed = Some(lexical.lexical_has_changed);
        self.lexical_summary = Some(lexical.lexical_summary.clone());

        let framing = &assessment.framing;
        self.framing_has_changed = Some(framing.framing_has_changed);
        self.framing_from_narrative = Some(framing.framing_from_narrative.clone());
        self.framing_to_narrative = Some(framing.framing_to_narrative.clone());
        self.framing_summary = Some(framing.framing_summary.clone());

        let audience = &assessment.audience;
        self.audience_has_changed = Some(audience.audience_has_changed);
        self.audience_primary_audience = Some(audience.audience_primary_audience.clone());
        self.audience_summary = Some(audience.audience_summary.clone());

        let ira = &assessment.ira_alignment;
        self.ira_alignment_detected = Some(ira.ira_alignment_detected);
        self.ira_evidence_type = Some(ira.ira_evidence_type.as_str().to_string());
        self.ira_specific_evidence = Some(ira.ira_specific_evidence.join("; "));
        self.ira_reasoning = Some(ira.ira_reasoning.clone());

        let synthesis = &assessment.synthesis;
        self.overall_change_level = Some(synthesis.overall_change_level.as_str().to_string());
        self.overall_confidence = Some(synthesis.overall_confidence);
        self.overall_synthesis_reasoning = Some(synthesis.overall_synthesis_reasoning.clone());
    }

    /// True when none of the sub-assessment or synthesis fields are set.
    pub fn has_no_assessment_fields(&self) -> bool {
        self.lexical_has_changed.is_none()
            && self.lexical_summary.is_none()
            && self.framing_has_changed.is_none()
            && self.framing_from_narrative.is_none()
            && self.framing_to_narrative.is_none()
            && self.framing_summary.is_none()
            && self.audience_has_changed.is_none()
            && self.audience_primary_audience.is_none()
            && self.audience_summary.is_none()
            && self.ira_alignment_detected.is_none()
            && self.ira_evidence_type.is_none()
            && self.ira_specific_evidence.is_none()
            && self.ira_reasoning.is_none()
            && self.overall_change_level.is_none()
            && self.overall_confidence.is_none()
            && self.overall_synthesis_reasoning.is_none()
    }
}
