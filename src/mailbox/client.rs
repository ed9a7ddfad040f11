//! HTTP client for the mailbox tool service.
//!
//! One logical RPC: `POST {base}/invoke_tool` with `{tool, user_id, arguments}`,
//! answered by `{result, success}`. The service signals failure as transport
//! or status errors, as `success: false`, or as a result string carrying its
//! error marker. This client folds all of them into `Err(ToolError)` so the
//! engine only ever sees an explicit success/failure value.

use serde_json::json;
use tracing::{debug, warn};

use async_trait::async_trait;

use crate::config::MailboxSettings;
use crate::error::ToolError;
use crate::mailbox::MailboxTools;
use crate::mailbox::types::{AdvanceOutcome, CurrentEmail, ToolInvocation, ToolResponse};

/// In-band error markers the backend prefixes failed results with.
const ERROR_MARKERS: &[&str] = &["ERROR:", "❌"];

/// Sentence the backend uses to report cursor exhaustion.
const EXHAUSTED_MARKER: &str = "No more emails";

/// Reqwest-backed mailbox tool client.
pub struct HttpMailboxClient {
    http: reqwest::Client,
    settings: MailboxSettings,
}

impl HttpMailboxClient {
    pub fn new(settings: MailboxSettings) -> Self {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { http, settings }
    }

    /// Invoke one tool and return its raw result text.
    async fn invoke(
        &self,
        tool: &str,
        user_id: &str,
        arguments: serde_json::Value,
    ) -> Result<String, ToolError> {
        let url = format!("{}/invoke_tool", self.settings.base_url.trim_end_matches('/'));
        let body = ToolInvocation {
            tool,
            user_id,
            arguments,
        };

        debug!(tool, user_id, "Invoking mailbox tool");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout {
                        tool: tool.to_string(),
                        timeout: self.settings.timeout,
                    }
                } else {
                    ToolError::RequestFailed {
                        tool: tool.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::RequestFailed {
                tool: tool.to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: ToolResponse =
            response
                .json()
                .await
                .map_err(|e| ToolError::MalformedResponse {
                    tool: tool.to_string(),
                    reason: e.to_string(),
                })?;

        if !parsed.success {
            warn!(tool, result = %parsed.result, "Mailbox tool reported failure");
            return Err(ToolError::ToolReported {
                tool: tool.to_string(),
                message: parsed.result,
            });
        }
        if let Some(marker) = ERROR_MARKERS
            .iter()
            .find(|m| parsed.result.trim_start().starts_with(**m))
        {
            warn!(tool, marker, "Mailbox tool result carries error marker");
            return Err(ToolError::ToolReported {
                tool: tool.to_string(),
                message: parsed.result,
            });
        }

        Ok(parsed.result)
    }
}

#[async_trait]
impl MailboxTools for HttpMailboxClient {
    async fn initialize_creds(&self, user_id: &str) -> Result<String, ToolError> {
        self.invoke("initialize_creds", user_id, json!({})).await
    }

    async fn get_emails(&self, user_id: &str, max_emails: u32) -> Result<String, ToolError> {
        self.invoke("get_emails", user_id, json!({ "max_emails": max_emails }))
            .await
    }

    async fn current_email(&self, user_id: &str) -> Result<CurrentEmail, ToolError> {
        // get_current_email is the one tool that returns JSON in its result
        // string; anything unparseable there is a contract violation.
        let raw = self.invoke("get_current_email", user_id, json!({})).await?;
        serde_json::from_str(&raw).map_err(|e| ToolError::MalformedResponse {
            tool: "get_current_email".to_string(),
            reason: e.to_string(),
        })
    }

    async fn current_email_for_reading(&self, user_id: &str) -> Result<String, ToolError> {
        self.invoke("get_current_email_for_reading", user_id, json!({}))
            .await
    }

    async fn read_full_current_email(&self, user_id: &str) -> Result<String, ToolError> {
        self.invoke("read_full_current_email", user_id, json!({}))
            .await
    }

    async fn advance(&self, user_id: &str) -> Result<AdvanceOutcome, ToolError> {
        let result = self.invoke("next_email", user_id, json!({})).await?;
        if result.contains(EXHAUSTED_MARKER) {
            Ok(AdvanceOutcome::Exhausted)
        } else {
            Ok(AdvanceOutcome::Moved(result))
        }
    }

    async fn send_reply(
        &self,
        user_id: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, ToolError> {
        self.invoke(
            "send_email_reply",
            user_id,
            json!({
                "recipient": recipient,
                "subject": subject,
                "body": body,
            }),
        )
        .await
    }

    async fn calendar_events(&self, user_id: &str, days: u32) -> Result<String, ToolError> {
        self.invoke("get_calendar_events", user_id, json!({ "days": days }))
            .await
    }

    async fn create_task(
        &self,
        user_id: &str,
        title: &str,
        description: &str,
    ) -> Result<String, ToolError> {
        self.invoke(
            "create_task",
            user_id,
            json!({ "title": title, "description": description }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_markers_cover_both_spellings() {
        assert!(ERROR_MARKERS.iter().any(|m| "ERROR: boom".starts_with(m)));
        assert!(ERROR_MARKERS.iter().any(|m| "❌ boom".starts_with(m)));
        assert!(!ERROR_MARKERS.iter().any(|m| "all good".starts_with(m)));
    }

    #[test]
    fn invocation_serializes_wire_shape() {
        let body = ToolInvocation {
            tool: "get_emails",
            user_id: "+15551234567",
            arguments: json!({ "max_emails": 5 }),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["tool"], "get_emails");
        assert_eq!(value["user_id"], "+15551234567");
        assert_eq!(value["arguments"]["max_emails"], 5);
    }
}
