//! OpenAI provider backed by the `/v1/chat/completions` API.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmSettings;
use crate::error::LlmError;
use crate::llm::{ChatMessage, LlmProvider};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

// ── Provider ────────────────────────────────────────────────────────────

/// OpenAI chat completions provider.
pub struct OpenAiProvider {
    settings: LlmSettings,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(settings: LlmSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { settings, client }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        utterance: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(WireMessage {
            role: "system",
            content: system_prompt,
        });
        for msg in history {
            messages.push(WireMessage {
                role: msg.role.as_str(),
                content: &msg.content,
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: utterance,
        });

        let body = CompletionRequest {
            model: &self.settings.model,
            messages,
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(self.settings.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        provider: "openai".to_string(),
                        timeout: self.settings.timeout,
                    }
                } else {
                    LlmError::RequestFailed {
                        provider: "openai".to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LlmError::AuthFailed {
                provider: "openai".to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: CompletionResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: "openai".to_string(),
                reason: e.to_string(),
            })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: "openai".to_string(),
                reason: "empty completion".to_string(),
            })?;

        debug!(model = %self.settings.model, chars = content.len(), "Completion received");
        Ok(content)
    }
}
