//! Run configuration: snapshot windows, candidate paths, service settings,
//! and retry budgets.
//!
//! Everything tunable lives here so that a run can be reproduced from a
//! single JSON file. Defaults mirror the study design (2022 vs 2023, mid-year
//! anchor).

use std::path::Path;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Default candidate page paths, in priority order.
pub const DEFAULT_PATHS: &[&str] = &[
    "/",
    "/about",
    "/company",
    "/our-company",
    "/mission",
    "/products",
    "/services",
    "/solutions",
    "/technology",
    "/sustainability",
    "/environmental",
    "/esg",
];

/// A calendar-year snapshot window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotWindow {
    /// Short label used in logs, e.g. `pre_ira`.
    pub label: String,
    pub year: i32,
    /// Captures closest to this date win. Defaults to July 1 of `year`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<NaiveDate>,
}

impl SnapshotWindow {
    pub fn new(label: impl Into<String>, year: i32) -> Self {
        Self {
            label: label.into(),
            year,
            anchor: None,
        }
    }

    /// First day of the window.
    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, 1, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the window (inclusive).
    pub fn end(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, 12, 31).unwrap_or(NaiveDate::MAX)
    }

    /// The instant captures are measured against.
    pub fn anchor_time(&self) -> NaiveDateTime {
        let date = self
            .anchor
            .or_else(|| NaiveDate::from_ymd_opt(self.year, 7, 1))
            .unwrap_or_else(|| self.start());
        date.and_time(chrono::NaiveTime::default())
    }

    pub fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        timestamp.year() == self.year
    }
}

/// Archive (Wayback Machine) service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    pub cdx_endpoint: String,
    /// Prefix for archived copies: `<base>/<timestamp>/<original url>`.
    pub wayback_base: String,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Minimum spacing between consecutive archive requests.
    pub min_request_interval_ms: u64,
    /// Maximum captures requested from the index per path query.
    pub capture_limit: u32,
    pub max_concurrent: usize,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            cdx_endpoint: "http://web.archive.org/cdx/search/cdx".into(),
            wayback_base: "https://web.archive.org/web".into(),
            user_agent: "Academic Research - IRA Corporate Analysis".into(),
            connect_timeout_secs: 10,
            request_timeout_secs: 45,
            min_request_interval_ms: 2000,
            capture_limit: 500,
            max_concurrent: 2,
        }
    }
}

impl ArchiveSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

/// Reasoning (LLM) service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningSettings {
    /// Base URL of an OpenAI-compatible API, without `/chat/completions`.
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_concurrent: usize,
    /// Attempts allowed per call for responses that fail schema validation.
    pub schema_attempts: u32,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".into(),
            model: "gpt-4.1-nano".into(),
            temperature: 0.1,
            max_tokens: 1000,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            max_concurrent: 4,
            schema_attempts: 3,
        }
    }
}

impl ReasoningSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Transient-failure retry budget, in serialisable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: 0.25,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
        }
    }
}

/// Text limits for extraction and prompting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Characters kept from each extracted page.
    pub content_limit: usize,
    /// Characters of each page sent in a prompt.
    pub prompt_limit: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            content_limit: 8000,
            prompt_limit: 3500,
        }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub pre_window: SnapshotWindow,
    pub post_window: SnapshotWindow,
    pub candidate_paths: Vec<String>,
    /// Companies processed concurrently.
    pub workers: usize,
    pub archive: ArchiveSettings,
    pub reasoning: ReasoningSettings,
    pub retry: RetrySettings,
    pub extraction: ExtractionSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pre_window: SnapshotWindow::new("pre_ira", 2022),
            post_window: SnapshotWindow::new("post_ira", 2023),
            candidate_paths: DEFAULT_PATHS.iter().map(|p| p.to_string()).collect(),
            workers: 2,
            archive: ArchiveSettings::default(),
            reasoning: ReasoningSettings::default(),
            retry: RetrySettings::default(),
            extraction: ExtractionSettings::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.candidate_paths.is_empty() {
            return Err(ConfigError::Invalid("candidate_paths is empty".into()));
        }
        if let Some(bad) = self.candidate_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid(format!(
                "candidate path {bad:?} must start with '/'"
            )));
        }
        if self.pre_window.year >= self.post_window.year {
            return Err(ConfigError::Invalid(format!(
                "pre window year {} must precede post window year {}",
                self.pre_window.year, self.post_window.year
            )));
        }
        for window in [&self.pre_window, &self.post_window] {
            if let Some(anchor) = window.anchor
                && anchor.year() != window.year
            {
                return Err(ConfigError::Invalid(format!(
                    "anchor {anchor} lies outside window {} ({})",
                    window.label, window.year
                )));
            }
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.archive.max_concurrent == 0 || self.reasoning.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "per-service concurrency must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.reasoning.schema_attempts == 0 {
            return Err(ConfigError::Invalid(
                "reasoning.schema_attempts must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(ConfigError::Invalid("retry.jitter must be within [0, 1]".into()));
        }
        if self.extraction.content_limit == 0 || self.extraction.prompt_limit == 0 {
            return Err(ConfigError::Invalid("extraction limits must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.candidate_paths.len(), 12);
        assert_eq!(config.candidate_paths[0], "/");
        assert_eq!(config.pre_window.year, 2022);
        assert_eq!(config.post_window.year, 2023);
    }

    #[test]
    fn anchor_defaults_to_mid_year() {
        let window = SnapshotWindow::new("pre_ira", 2022);
        assert_eq!(window.anchor_time().to_string(), "2022-07-01 00:00:00");
        assert_eq!(window.start().to_string(), "2022-01-01");
        assert_eq!(window.end().to_string(), "2022-12-31");
    }

    #[test]
    fn window_contains_only_its_year() {
        let window = SnapshotWindow::new("post_ira", 2023);
        let inside = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let outside = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(window.contains(&inside));
        assert!(!window.contains(&outside));
    }

    #[test]
    fn rejects_unordered_windows() {
        let mut config = AnalysisConfig::default();
        config.post_window.year = 2022;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_anchor_outside_year() {
        let mut config = AnalysisConfig::default();
        config.pre_window.anchor = NaiveDate::from_ymd_opt(2023, 3, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_paths_and_zero_budgets() {
        let mut config = AnalysisConfig::default();
        config.candidate_paths.clear();
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "candidate_paths": ["/about", "/sustainability"],
                "pre_window": {{"label": "pre", "year": 2022, "anchor": "2022-06-30"}},
                "retry": {{"max_attempts": 5}}
            }}"#
        )
        .unwrap();
        let config = AnalysisConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.candidate_paths, vec!["/about", "/sustainability"]);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.post_window.year, 2023);
        assert_eq!(
            config.pre_window.anchor_time().to_string(),
            "2022-06-30 00:00:00"
        );
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AnalysisConfig::from_json_file(Path::new("/nonexistent/iralens.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn retry_settings_convert_to_policy() {
        let policy = RetrySettings::default().policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }
}
