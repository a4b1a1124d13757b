//! Hierarchical assessment: four independent sub-assessments, then synthesis.

use iralens_core::{
    Assessment, AudienceAssessment, Dimension, FramingAssessment, IraAlignmentAssessment,
    LexicalAssessment, RetryPolicy, Synthesis,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::prompts;
use crate::schema::{ResponseSchema, SYNTHESIS};
use crate::service::{Prompt, ReasoningError, ReasoningService};

pub const DEFAULT_SCHEMA_ATTEMPTS: u32 = 3;
pub const DEFAULT_PROMPT_LIMIT: usize = 3500;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{stage}: no schema-conforming response after {attempts} attempts (last: {last})")]
    SchemaExhausted {
        stage: &'static str,
        attempts: u32,
        last: String,
    },
    #[error("{stage}: reasoning service failed: {source}")]
    Service {
        stage: &'static str,
        #[source]
        source: ReasoningError,
    },
}

impl AnalysisError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::SchemaExhausted { stage, .. } | Self::Service { stage, .. } => stage,
        }
    }
}

/// Drives the four sub-assessments concurrently and the synthesis after them.
///
/// Two budgets apply per call: `policy` retries transient service failures
/// within one attempt, and `schema_attempts` bounds how many answers may be
/// rejected as structurally invalid.
pub struct HierarchicalAnalyzer<R> {
    service: R,
    policy: RetryPolicy,
    schema_attempts: u32,
    prompt_limit: usize,
}

impl<R: ReasoningService> HierarchicalAnalyzer<R> {
    pub fn new(service: R, policy: RetryPolicy) -> Self {
        Self {
            service,
            policy,
            schema_attempts: DEFAULT_SCHEMA_ATTEMPTS,
            prompt_limit: DEFAULT_PROMPT_LIMIT,
        }
    }

    pub fn with_schema_attempts(mut self, attempts: u32) -> Self {
        self.schema_attempts = attempts;
        self
    }

    pub fn with_prompt_limit(mut self, limit: usize) -> Self {
        self.prompt_limit = limit;
        self
    }

    pub async fn assess(&self, pre: &str, post: &str) -> Result<Assessment, AnalysisError> {
        let prompt_for = |d| prompts::dimension_prompt(d, pre, post, self.prompt_limit);
        let lexical_prompt = prompt_for(Dimension::Lexical);
        let framing_prompt = prompt_for(Dimension::Framing);
        let audience_prompt = prompt_for(Dimension::Audience);
        let ira_prompt = prompt_for(Dimension::IraAlignment);

        let (lexical, framing, audience, ira_alignment) = tokio::try_join!(
            self.sub_assessment::<LexicalAssessment>(Dimension::Lexical, &lexical_prompt),
            self.sub_assessment::<FramingAssessment>(Dimension::Framing, &framing_prompt),
            self.sub_assessment::<AudienceAssessment>(Dimension::Audience, &audience_prompt),
            self.sub_assessment::<IraAlignmentAssessment>(Dimension::IraAlignment, &ira_prompt),
        )?;

        let synthesis_prompt =
            prompts::synthesis_prompt(&lexical, &framing, &audience, &ira_alignment, pre, post);
        let synthesis: Synthesis = self
            .request_validated("synthesis", &synthesis_prompt, &SYNTHESIS)
            .await?;

        info!(
            change_level = synthesis.overall_change_level.as_str(),
            confidence = synthesis.overall_confidence,
            "assessment complete"
        );
        Ok(Assessment {
            lexical,
            framing,
            audience,
            ira_alignment,
            synthesis,
        })
    }

    async fn sub_assessment<T: DeserializeOwned>(
        &self,
        dimension: Dimension,
        prompt: &Prompt,
    ) -> Result<T, AnalysisError> {
        self.request_validated(dimension.as_str(), prompt, ResponseSchema::for_dimension(dimension))
            .await
    }

    async fn request_validated<T: DeserializeOwned>(
        &self,
        stage: &'static str,
        prompt: &Prompt,
        schema: &ResponseSchema,
    ) -> Result<T, AnalysisError> {
        let attempts = self.schema_attempts.max(1);
        let mut last = String::new();

        for attempt in 1..=attempts {
            let response = self
                .policy
                .run(stage, || self.service.request(prompt, schema))
                .await;

            let value = match response {
                Ok(value) => value,
                Err(err) if err.is_structural() => {
                    warn!(stage, attempt, attempts, error = %err, "unparseable response");
                    last = err.to_string();
                    continue;
                }
                Err(source) => return Err(AnalysisError::Service { stage, source }),
            };

            match schema.parse::<T>(&value) {
                Ok(parsed) => {
                    debug!(stage, attempt, "response accepted");
                    return Ok(parsed);
                }
                Err(violation) => {
                    warn!(stage, attempt, attempts, error = %violation, "response rejected by schema");
                    last = violation.to_string();
                }
            }
        }

        Err(AnalysisError::SchemaExhausted {
            stage,
            attempts,
            last,
        })
    }
}
