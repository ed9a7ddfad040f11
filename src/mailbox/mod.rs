//! Mailbox tool service integration.
//!
//! The mailbox backend fetches, scores and sends mail and tracks the read
//! cursor. The core only speaks its `invoke_tool` RPC through the typed
//! client here; the `MailboxTools` trait is the seam tests stub out.

pub mod analysis;
pub mod client;
pub mod types;

pub use client::HttpMailboxClient;
pub use types::{AdvanceOutcome, CurrentEmail, EmailAnalysis, EmailRecord, ImportanceLevel};

use async_trait::async_trait;

use crate::error::ToolError;

/// The closed set of mailbox operations the conversation core uses.
///
/// `advance` and `send_reply` have remote side effects (cursor move, mail
/// send) and are called at most once per caller intent; everything else is
/// idempotent at the protocol level.
#[async_trait]
pub trait MailboxTools: Send + Sync {
    /// Initialize mail credentials for this user.
    async fn initialize_creds(&self, user_id: &str) -> Result<String, ToolError>;

    /// Fetch and analyze up to `max_emails` emails; returns a spoken summary.
    async fn get_emails(&self, user_id: &str, max_emails: u32) -> Result<String, ToolError>;

    /// Structured view of the email under the cursor.
    async fn current_email(&self, user_id: &str) -> Result<CurrentEmail, ToolError>;

    /// Voice-ready subject prompt for the email under the cursor.
    async fn current_email_for_reading(&self, user_id: &str) -> Result<String, ToolError>;

    /// Voice-ready full body of the email under the cursor.
    async fn read_full_current_email(&self, user_id: &str) -> Result<String, ToolError>;

    /// Advance the cursor. Reports exhaustion instead of erroring.
    async fn advance(&self, user_id: &str) -> Result<AdvanceOutcome, ToolError>;

    /// Send a reply from this user's account.
    async fn send_reply(
        &self,
        user_id: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, ToolError>;

    /// Calendar lookahead (backend stub, deterministic text).
    async fn calendar_events(&self, user_id: &str, days: u32) -> Result<String, ToolError>;

    /// Create a task (backend stub, deterministic text).
    async fn create_task(
        &self,
        user_id: &str,
        title: &str,
        description: &str,
    ) -> Result<String, ToolError>;
}
