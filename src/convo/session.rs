//! Per-call conversation session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;
use crate::mailbox::EmailRecord;

/// History is only short-term memory for the generative fallback; older turns
/// are dropped to bound prompt cost.
pub const MAX_HISTORY_TURNS: usize = 40;

/// How many trailing history messages the generative fallback sees.
pub const HISTORY_WINDOW: usize = 10;

/// Phase of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Initial phase, right after the caller connects.
    #[default]
    Greeting,
    /// Walking through the analyzed inbox, one email at a time.
    EmailReading,
    /// Waiting for the caller to dictate a reply body.
    Responding,
    /// Idle resting state; open conversation, calendar, tasks, farewell.
    General,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::EmailReading => "email_reading",
            Self::Responding => "responding",
            Self::General => "general",
        };
        write!(f, "{s}")
    }
}

/// Transient per-session keys that survive between turns.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// The email the caller is dictating a reply to. Set on the reply intent,
    /// cleared by the send (or by losing track of it).
    pub responding_to: Option<EmailRecord>,
    /// Set after the task prompt; the next general-mode utterance becomes
    /// the task title.
    pub awaiting_task: bool,
}

/// One live call's conversation state.
///
/// There is no in-memory call stack spanning turns: each webhook turn loads
/// this state, computes, and stores it back. Everything a later turn needs
/// must live here.
#[derive(Debug)]
pub struct ConversationSession {
    /// Registry key: the call SID.
    pub session_id: String,
    /// Mailbox identity: the caller's phone number (falls back to the SID).
    pub user_id: String,
    pub mode: Mode,
    pub context: SessionContext,
    history: Vec<ChatMessage>,
    pub started_at: DateTime<Utc>,
    pub last_turn_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            mode: Mode::default(),
            context: SessionContext::default(),
            history: Vec::new(),
            started_at: now,
            last_turn_at: now,
        }
    }

    pub fn push_user(&mut self, content: &str) {
        self.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.push(ChatMessage::assistant(content));
    }

    fn push(&mut self, msg: ChatMessage) {
        self.history.push(msg);
        if self.history.len() > MAX_HISTORY_TURNS {
            let excess = self.history.len() - MAX_HISTORY_TURNS;
            self.history.drain(..excess);
        }
    }

    /// Trailing history window for the generative fallback, excluding the
    /// utterance currently being processed (it is passed separately).
    pub fn history_window(&self) -> &[ChatMessage] {
        let len = self.history.len();
        let drop_current = usize::from(
            self.history
                .last()
                .is_some_and(|m| m.role == crate::llm::Role::User),
        );
        let end = len - drop_current;
        &self.history[end.saturating_sub(HISTORY_WINDOW)..end]
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn touch(&mut self) {
        self.last_turn_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_greeting_with_empty_context() {
        let session = ConversationSession::new("CA123", "+15551234567");
        assert_eq!(session.mode, Mode::Greeting);
        assert!(session.context.responding_to.is_none());
        assert_eq!(session.history_len(), 0);
    }

    #[test]
    fn history_is_capped() {
        let mut session = ConversationSession::new("CA123", "+15551234567");
        for i in 0..(MAX_HISTORY_TURNS * 2) {
            session.push_user(&format!("turn {i}"));
        }
        assert_eq!(session.history_len(), MAX_HISTORY_TURNS);
    }

    #[test]
    fn history_window_excludes_pending_user_turn() {
        let mut session = ConversationSession::new("CA123", "+15551234567");
        session.push_user("hello");
        session.push_assistant("hi there");
        session.push_user("read my email");
        let window = session.history_window();
        assert_eq!(window.len(), 2);
        assert_eq!(window.last().unwrap().content, "hi there");
    }

    #[test]
    fn mode_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&Mode::EmailReading).unwrap(),
            "\"email_reading\""
        );
        assert_eq!(Mode::Responding.to_string(), "responding");
    }
}
