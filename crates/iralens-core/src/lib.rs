pub mod assessment;
pub mod company;
pub mod config;
pub mod record;
pub mod retry;
pub mod schema;
pub mod state;

pub use assessment::{
    Assessment, AudienceAssessment, ChangeLevel, Dimension, EvidenceType, FramingAssessment,
    IraAlignmentAssessment, LexicalAssessment, Synthesis,
};
pub use company::{Capture, Company, ContentRecord, ExtractionFailure, ExtractionStatus, SnapshotResult};
pub use config::{AnalysisConfig, ConfigError, SnapshotWindow};
pub use record::{Outcome, ResultRow};
pub use retry::{Retryable, RetryPolicy};
pub use schema::results;
pub use state::{CompanyState, InvalidTransition, RunStatus};
