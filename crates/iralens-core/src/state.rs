//! Per-company processing state machine.
//!
//! ```text
//! Pending → ResolvingSnapshots → InsufficientSnapshots*
//!                              → Extracting → ContentExtractionFailed*
//!                                           → Analyzing → AnalysisError*
//!                                                       → Completed*
//! ```
//!
//! Starred states are terminal and map onto [`RunStatus`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal status recorded on every result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    InsufficientSnapshots,
    ContentExtractionFailed,
    AnalysisError,
}

impl RunStatus {
    pub const ALL: [RunStatus; 4] = [
        Self::Completed,
        Self::InsufficientSnapshots,
        Self::ContentExtractionFailed,
        Self::AnalysisError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InsufficientSnapshots => "insufficient_snapshots",
            Self::ContentExtractionFailed => "content_extraction_failed",
            Self::AnalysisError => "analysis_error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyState {
    Pending,
    ResolvingSnapshots,
    Extracting,
    Analyzing,
    Terminal(RunStatus),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid state transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: CompanyState,
    pub to: CompanyState,
}

impl CompanyState {
    /// Move to `next`, rejecting any edge not in the state diagram.
    pub fn advance(self, next: CompanyState) -> Result<CompanyState, InvalidTransition> {
        use CompanyState::*;
        use RunStatus::*;

        let allowed = matches!(
            (self, next),
            (Pending, ResolvingSnapshots)
                | (ResolvingSnapshots, Extracting)
                | (ResolvingSnapshots, Terminal(InsufficientSnapshots))
                | (Extracting, Analyzing)
                | (Extracting, Terminal(ContentExtractionFailed))
                | (Analyzing, Terminal(AnalysisError))
                | (Analyzing, Terminal(Completed))
        );
        if allowed {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    pub fn status(&self) -> Option<RunStatus> {
        match self {
            Self::Terminal(status) => Some(*status),
            _ => None,
        }
    }
}
