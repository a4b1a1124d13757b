//! Run orchestration: drives each company through resolution, extraction and
//! analysis, and accounts for every company that drops out on the way.

pub mod attrition;
pub mod limits;
pub mod orchestrator;

pub use attrition::{AttritionCounters, AttritionCounts, AttritionReport, StatusSummary};
pub use limits::{LimitedArchive, LimitedReasoning};
pub use orchestrator::{Orchestrator, RunSummary};
