//! Generative-language integration.
//!
//! The conversation engine only needs one operation: turn a system prompt,
//! a short history window, and the caller's latest utterance into free text.
//! The trait keeps that seam narrow so tests can inject a stub provider.

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmSettings;
use crate::error::LlmError;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message of conversation context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A free-text generation provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier for logging.
    fn model_name(&self) -> &str;

    /// Generate a conversational reply.
    ///
    /// `history` is the short-term memory window; the latest utterance goes
    /// last. Implementations must bound the call with a timeout and surface
    /// it as `LlmError::Timeout`. Callers degrade to canned text on any error.
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        utterance: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError>;
}

/// Create the default provider from settings.
pub fn create_provider(settings: &LlmSettings) -> Arc<dyn LlmProvider> {
    Arc::new(openai::OpenAiProvider::new(settings.clone()))
}
