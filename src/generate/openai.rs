//! OpenAI-compatible chat completions backend

use super::prompt;
use super::{BackendError, CodeGenerator, GenerationRequest};
use crate::config::{ConfigError, GeneratorConfig};
use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;

pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Statuses worth retrying
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

#[async_trait]
impl CodeGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": prompt::system_message(request) },
                { "role": "user", "content": prompt::render(request) },
            ],
        });

        debug!("POST {} ({})", self.endpoint, self.model);
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transient(format!("HTTP error: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = format!("API error {}: {}", status, text.trim());
            return Err(if is_retryable(status) {
                BackendError::Transient(message)
            } else {
                BackendError::Fatal(message)
            });
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| BackendError::Fatal(format!("malformed response body: {}", e)))?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::Fatal("response has no message content".to_string()))
    }
}
