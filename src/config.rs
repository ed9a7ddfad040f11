//! Configuration types.
//!
//! Everything is environment-driven. Required settings fail fast at startup
//! with a hint; optional subsystems (Twilio) simply come up disabled.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default bound on any single mailbox tool or LLM call.
pub const DEFAULT_BOUNDARY_TIMEOUT: Duration = Duration::from_secs(30);

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host/port the webhook server binds to.
    pub bind_host: String,
    pub bind_port: u16,
    /// Publicly reachable base URL (ngrok or deployed host) used to build
    /// the TwiML callback URLs handed to Twilio.
    pub base_url: String,
    pub mailbox: MailboxSettings,
    pub llm: LlmSettings,
    /// `None` means the voice provider is unavailable and the service runs
    /// degraded: health answers, voice endpoints apologize, /make-call refuses.
    pub twilio: Option<TwilioConfig>,
}

/// Settings for the mailbox tool service.
#[derive(Debug, Clone)]
pub struct MailboxSettings {
    /// Base URL of the mailbox backend (its `/invoke_tool` endpoint lives here).
    pub base_url: String,
    /// Per-call timeout for tool invocations.
    pub timeout: Duration,
    /// How many emails a triage pass fetches and analyzes.
    pub max_emails: u32,
}

/// Settings for the generative-language provider.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: SecretString,
    pub model: String,
    /// Per-call timeout for completions.
    pub timeout: Duration,
}

/// Twilio credentials for call origination and webhook rendering.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    /// E.164 number calls originate from.
    pub from_number: String,
}

impl TwilioConfig {
    /// Build config from environment variables.
    /// Returns `None` if `TWILIO_ACCOUNT_SID` is not set (voice origination disabled).
    pub fn from_env() -> Option<Self> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID").ok()?;
        let auth_token = std::env::var("TWILIO_AUTH_TOKEN").ok()?;
        let from_number = std::env::var("TWILIO_NUMBER").ok()?;

        Some(Self {
            account_sid,
            auth_token: SecretString::from(auth_token),
            from_number,
        })
    }
}

impl AppConfig {
    /// Build the full service configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_host = std::env::var("VOICE_ASSIST_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let bind_port: u16 = match std::env::var("VOICE_ASSIST_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "VOICE_ASSIST_PORT".to_string(),
                message: format!("not a valid port: {raw}"),
            })?,
            Err(_) => 8000,
        };

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{bind_port}"));

        let mailbox_url =
            std::env::var("MAILBOX_SERVICE_URL").map_err(|_| ConfigError::MissingRequired {
                key: "MAILBOX_SERVICE_URL".to_string(),
                hint: "Set it to the base URL of the mailbox tool service, e.g. http://localhost:9100".to_string(),
            })?;

        let tool_timeout_secs: u64 = std::env::var("MAILBOX_TOOL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BOUNDARY_TIMEOUT.as_secs());

        let max_emails: u32 = std::env::var("MAILBOX_MAX_EMAILS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| ConfigError::MissingRequired {
                key: "OPENAI_API_KEY".to_string(),
                hint: "Set it to an OpenAI API key, e.g. export OPENAI_API_KEY=sk-...".to_string(),
            })?;

        let model = std::env::var("VOICE_ASSIST_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let llm_timeout_secs: u64 = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BOUNDARY_TIMEOUT.as_secs());

        Ok(Self {
            bind_host,
            bind_port,
            base_url,
            mailbox: MailboxSettings {
                base_url: mailbox_url,
                timeout: Duration::from_secs(tool_timeout_secs),
                max_emails,
            },
            llm: LlmSettings {
                api_key: SecretString::from(api_key),
                model,
                timeout: Duration::from_secs(llm_timeout_secs),
            },
            twilio: TwilioConfig::from_env(),
        })
    }
}
