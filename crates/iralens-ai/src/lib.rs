//! Reasoning layer: response schemas, prompts, and the hierarchical analyzer
//! that drives an external LLM through them.

pub mod analyzer;
pub mod prompts;
pub mod schema;
mod service;

#[cfg(feature = "openai")]
mod openai;

pub use analyzer::{AnalysisError, HierarchicalAnalyzer};
pub use schema::{FieldKind, FieldSpec, ResponseSchema, SchemaViolation};
pub use service::{Prompt, ReasoningError, ReasoningService};

#[cfg(feature = "openai")]
pub use openai::OpenAiClient;
