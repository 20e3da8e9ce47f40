//! The pluggable inference capability and its HTTP implementation.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::configuration::InferenceSettings;
use crate::error::EngineError;

/// Natural-language inference capability used by the classifier and the
/// similarity matcher. Implementations return parsed JSON; transport and
/// auth details stay behind this boundary.
#[async_trait]
pub trait Inference: Send + Sync {
    async fn classify(&self, prompt: &str) -> Result<Value, EngineError>;
    async fn compare(&self, prompt: &str) -> Result<Value, EngineError>;
}

/// OpenAI-style chat-completions client with JSON response mode and a
/// bounded per-call timeout. Timeouts and transport failures surface as
/// `ExternalService`; an unparseable body is a `Validation` failure since
/// retrying cannot fix a malformed schema.
pub struct HttpInference {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpInference {
    pub fn new(settings: &InferenceSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .expect("failed to build inference http client");

        HttpInference {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        }
    }

    async fn complete_json(&self, prompt: &str) -> Result<Value, EngineError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| EngineError::external(err.to_string()))?
            .error_for_status()
            .map_err(|err| EngineError::external(err.to_string()))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|err| EngineError::validation(format!("inference response was not JSON: {err}")))?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::validation("inference response missing message content"))?;

        serde_json::from_str(content).map_err(|err| {
            EngineError::validation(format!("inference message content was not valid JSON: {err}"))
        })
    }
}

#[async_trait]
impl Inference for HttpInference {
    async fn classify(&self, prompt: &str) -> Result<Value, EngineError> {
        self.complete_json(prompt).await
    }

    async fn compare(&self, prompt: &str) -> Result<Value, EngineError> {
        self.complete_json(prompt).await
    }
}
