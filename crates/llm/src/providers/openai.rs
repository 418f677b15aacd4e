use async_trait::async_trait;
use docrelay_core::config::LlmConfig;
use serde::Serialize;
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message};

/// Request fields that stay fixed for every call.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: Option<f32>,
}

impl CompletionSettings {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_output_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    host: String,
    settings: CompletionSettings,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        endpoint: String,
        settings: CompletionSettings,
    ) -> Result<Self, LlmError> {
        let parsed = url::Url::parse(&endpoint)
            .map_err(|e| LlmError::NotConfigured(format!("invalid endpoint '{endpoint}': {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| LlmError::NotConfigured(format!("endpoint '{endpoint}' has no host")))?
            .to_string();

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint,
            host,
            settings,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
        };

        debug!(url = %self.endpoint, messages = messages.len(), "Chat completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))?
            .to_string();

        Ok(content)
    }

    fn host(&self) -> &str {
        &self.host
    }
}
