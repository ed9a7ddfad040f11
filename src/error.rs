//! Error types for Voice Assist.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Mailbox tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Voice transport error: {0}")]
    Voice(#[from] VoiceError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Generative-language provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Mailbox tool invocation errors.
///
/// Every variant is recoverable at the turn level: the conversation engine
/// converts these into an apologetic directive rather than letting them
/// escape past a turn.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {tool} request failed: {reason}")]
    RequestFailed { tool: String, reason: String },

    #[error("Tool {tool} timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    #[error("Tool {tool} returned an error: {message}")]
    ToolReported { tool: String, message: String },

    #[error("Malformed response from tool {tool}: {reason}")]
    MalformedResponse { tool: String, reason: String },
}

/// Telephony transport errors.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Call origination failed: {0}")]
    CallFailed(String),

    #[error("Telephony provider rejected the request ({status}): {body}")]
    ProviderRejected { status: u16, body: String },

    #[error("Voice provider is not configured: {0}")]
    NotConfigured(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
