//! Attrition accounting: how many companies ended in each terminal status,
//! and whether the drop-outs differ in size from the completed group.

use std::sync::atomic::{AtomicU64, Ordering};

use iralens_core::{ResultRow, RunStatus};

/// Lock-free per-status counters shared by all workers of a run.
#[derive(Debug, Default)]
pub struct AttritionCounters {
    counts: [AtomicU64; 4],
}

fn slot(status: RunStatus) -> usize {
    match status {
        RunStatus::Completed => 0,
        RunStatus::InsufficientSnapshots => 1,
        RunStatus::ContentExtractionFailed => 2,
        RunStatus::AnalysisError => 3,
    }
}

impl AttritionCounters {
    pub fn record(&self, status: RunStatus) {
        self.counts[slot(status)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AttritionCounts {
        let get = |status| self.counts[slot(status)].load(Ordering::Relaxed);
        AttritionCounts {
            completed: get(RunStatus::Completed),
            insufficient_snapshots: get(RunStatus::InsufficientSnapshots),
            content_extraction_failed: get(RunStatus::ContentExtractionFailed),
            analysis_error: get(RunStatus::AnalysisError),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttritionCounts {
    pub completed: u64,
    pub insufficient_snapshots: u64,
    pub content_extraction_failed: u64,
    pub analysis_error: u64,
}

impl AttritionCounts {
    pub fn get(&self, status: RunStatus) -> u64 {
        match status {
            RunStatus::Completed => self.completed,
            RunStatus::InsufficientSnapshots => self.insufficient_snapshots,
            RunStatus::ContentExtractionFailed => self.content_extraction_failed,
            RunStatus::AnalysisError => self.analysis_error,
        }
    }

    pub fn total(&self) -> u64 {
        RunStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

/// One line of the attrition table.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub status: RunStatus,
    pub count: u64,
    /// Fraction of all rows, in `[0, 1]`.
    pub share: f64,
    /// Over rows of this status that carry a size.
    pub mean_size: Option<f64>,
    pub median_size: Option<f64>,
    pub with_size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttritionReport {
    pub total: u64,
    /// One entry per status, in [`RunStatus::ALL`] order.
    pub groups: Vec<StatusSummary>,
    /// Rows whose status string is not a known terminal status.
    pub unrecognized: u64,
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

impl AttritionReport {
    pub fn from_rows(rows: &[ResultRow]) -> Self {
        let total = rows.len() as u64;
        let mut unrecognized = 0;
        let mut sizes: [Vec<f64>; 4] = Default::default();
        let mut counts = [0u64; 4];

        for row in rows {
            match row.run_status() {
                Some(status) => {
                    counts[slot(status)] += 1;
                    if let Some(size) = row.company_size
                        && size.is_finite()
                    {
                        sizes[slot(status)].push(size);
                    }
                }
                None => unrecognized += 1,
            }
        }

        let groups = RunStatus::ALL
            .into_iter()
            .map(|status| {
                let i = slot(status);
                let count = counts[i];
                let group_sizes = &mut sizes[i];
                StatusSummary {
                    status,
                    count,
                    share: if total == 0 {
                        0.0
                    } else {
                        count as f64 / total as f64
                    },
                    mean_size: mean(group_sizes),
                    median_size: median(group_sizes),
                    with_size: group_sizes.len() as u64,
                }
            })
            .collect();

        Self {
            total,
            groups,
            unrecognized,
        }
    }

    pub fn count(&self, status: RunStatus) -> u64 {
        self.groups
            .iter()
            .find(|g| g.status == status)
            .map_or(0, |g| g.count)
    }

    /// Every row is accounted for by exactly one terminal status.
    pub fn identity_holds(&self) -> bool {
        self.unrecognized == 0 && self.groups.iter().map(|g| g.count).sum::<u64>() == self.total
    }
}
