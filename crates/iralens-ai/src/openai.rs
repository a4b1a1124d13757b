//! OpenAI-compatible chat-completions client with strict structured output.

use async_trait::async_trait;
use iralens_core::config::ReasoningSettings;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::schema::ResponseSchema;
use crate::service::{Prompt, ReasoningError, ReasoningService};

pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl OpenAiClient {
    /// `settings.endpoint` is the API base, e.g. `https://api.openai.com/v1`.
    pub fn new(settings: &ReasoningSettings, api_key: impl Into<String>) -> Result<Self, ReasoningError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    fn request_body(&self, prompt: &Prompt, schema: &ResponseSchema) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "strict": true,
                    "schema": schema.to_json_schema(),
                },
            },
        })
    }
}

#[async_trait]
impl ReasoningService for OpenAiClient {
    async fn request(&self, prompt: &Prompt, schema: &ResponseSchema) -> Result<Value, ReasoningError> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!(url = %url, schema = schema.name, model = %self.model, "requesting completion");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, schema))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReasoningError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // A 200 whose envelope does not parse is a bad answer, not a failed call.
        let raw = resp.text().await?;
        let completion: ChatCompletion = serde_json::from_str(&raw)
            .map_err(|e| ReasoningError::InvalidJson(format!("completion envelope: {e}")))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ReasoningError::InvalidJson("completion has no message content".into()))?;

        serde_json::from_str(&content).map_err(|e| ReasoningError::InvalidJson(e.to_string()))
    }
}
