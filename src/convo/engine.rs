//! Conversation state machine.
//!
//! One engine instance serves every call; all per-call state lives in the
//! [`ConversationSession`] passed into [`ConversationEngine::process_turn`].
//! A turn is: classify the utterance in the current mode, run the matching
//! handler (which may call mailbox tools or the generative provider), mutate
//! mode/context, and return a [`TurnDirective`] for the transport to render.
//!
//! `process_turn` is infallible by construction: every boundary call returns
//! a `Result` consumed right here, and every failure path degrades to an
//! apologetic directive instead of dead air.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::convo::intent::{Intent, classify};
use crate::convo::prompts;
use crate::convo::session::{ConversationSession, Mode};
use crate::llm::LlmProvider;
use crate::mailbox::{AdvanceOutcome, MailboxTools};

// ── Canned lines ────────────────────────────────────────────────────────

const APOLOGY_RETRY: &str =
    "I'm sorry, I ran into a problem with that. Could you please try again?";

const GREETING_FALLBACK: &str = "Hello! I'm your email assistant. How can I help you today? \
You can ask me to read your emails, check your calendar, or manage tasks.";

const GENERAL_FALLBACK: &str = "I can help you with reading emails, checking your calendar, \
or managing tasks. What would you like to do?";

const READING_MENU: &str = "I'll continue reading. Say 'next' to skip to the next email, \
or 'respond' if you'd like to reply to this one.";

const READING_CHOICE_TAIL: &str =
    "Say 'respond' to reply, 'next' for the next email, or 'stop' to finish reading.";

const NO_MORE_EMAILS: &str = "No more emails to read.";

// ── Directive ───────────────────────────────────────────────────────────

/// What the transport should do after this turn. Closed set; each variant
/// maps 1:1 to a rendering rule in the voice routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnAction {
    /// Speak and gather the next utterance.
    Continue,
    /// Inbox triage just ran; present the first email next.
    StartEmailReading,
    /// Cursor advanced; present the new current email next.
    ReadNextEmail,
    /// Stay in the reading flow; re-present the current email next.
    ContinueReading,
    /// Gather the reply body the caller is about to dictate.
    WaitForResponseContent,
    /// Say goodbye, hang up, destroy the session.
    EndCall,
}

impl std::fmt::Display for TurnAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Continue => "continue",
            Self::StartEmailReading => "start_email_reading",
            Self::ReadNextEmail => "read_next_email",
            Self::ContinueReading => "continue_reading",
            Self::WaitForResponseContent => "wait_for_response_content",
            Self::EndCall => "end_call",
        };
        write!(f, "{s}")
    }
}

/// The state machine's output for one turn. Every side effect the transport
/// must perform is encoded in `action`; there is no hidden channel.
#[derive(Debug, Clone, Serialize)]
pub struct TurnDirective {
    /// Full text, for logs and the API surface.
    pub response_text: String,
    /// Text to speak; may be shorter than `response_text`.
    pub tts_text: String,
    pub action: TurnAction,
}

impl TurnDirective {
    fn speak(text: impl Into<String>, action: TurnAction) -> Self {
        let text = text.into();
        Self {
            tts_text: text.clone(),
            response_text: text,
            action,
        }
    }

    fn with_tts(response_text: impl Into<String>, tts_text: impl Into<String>, action: TurnAction) -> Self {
        Self {
            response_text: response_text.into(),
            tts_text: tts_text.into(),
            action,
        }
    }
}

// ── Engine ──────────────────────────────────────────────────────────────

/// The per-call dialog state machine.
pub struct ConversationEngine {
    mailbox: Arc<dyn MailboxTools>,
    llm: Arc<dyn LlmProvider>,
    /// How many emails one triage pass fetches.
    max_emails: u32,
}

impl ConversationEngine {
    pub fn new(mailbox: Arc<dyn MailboxTools>, llm: Arc<dyn LlmProvider>, max_emails: u32) -> Self {
        Self {
            mailbox,
            llm,
            max_emails,
        }
    }

    /// Process one caller utterance. Always returns a directive with
    /// non-empty speech; never panics past this boundary.
    pub async fn process_turn(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> TurnDirective {
        session.touch();
        session.push_user(utterance);

        let mode_before = session.mode;
        let directive = match session.mode {
            Mode::Greeting => self.handle_greeting(session, utterance).await,
            Mode::EmailReading => self.handle_email_reading(session, utterance).await,
            Mode::Responding => self.handle_responding(session, utterance).await,
            Mode::General => self.handle_general(session, utterance).await,
        };

        session.push_assistant(&directive.response_text);
        info!(
            call_sid = %session.session_id,
            mode_before = %mode_before,
            mode_after = %session.mode,
            action = %directive.action,
            "Turn processed"
        );
        directive
    }

    /// Voice-ready presentation of the email under the cursor, for the
    /// transport's email-presentation step. Prefers the structured view so
    /// the prompt can mention the importance analysis (rule-based fallback
    /// when the backend's scorer produced nothing usable), then the
    /// backend's own reading prompt. Exhaustion and tool failure degrade to
    /// the fixed no-more-emails sentence.
    pub async fn presentation_text(&self, session: &ConversationSession) -> String {
        match self.mailbox.current_email(&session.user_id).await {
            Ok(current) => {
                let analysis = current.email.analysis_or_fallback();
                format!(
                    "Email {}. From {}. Subject: {}. This one looks {} priority. \
                     Would you like me to read it, respond, or move to the next one?",
                    current.position,
                    current.email.sender,
                    current.email.subject,
                    analysis.importance_level.spoken(),
                )
            }
            Err(_) => match self.mailbox.current_email_for_reading(&session.user_id).await {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => NO_MORE_EMAILS.to_string(),
                Err(e) => {
                    warn!(call_sid = %session.session_id, error = %e, "Could not fetch current email");
                    NO_MORE_EMAILS.to_string()
                }
            },
        }
    }

    // ── Mode handlers ───────────────────────────────────────────────────

    async fn handle_greeting(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> TurnDirective {
        match classify(Mode::Greeting, utterance) {
            Intent::StartEmailReading => self.start_email_reading(session).await,
            _ => self
                .generative_reply(session, prompts::GREETING_SYSTEM, utterance, 150, GREETING_FALLBACK)
                .await,
        }
    }

    /// Triage the inbox and enter the reading flow. Shared by the greeting
    /// handler and the general-mode email intent.
    async fn start_email_reading(&self, session: &mut ConversationSession) -> TurnDirective {
        if let Err(e) = self.mailbox.initialize_creds(&session.user_id).await {
            warn!(call_sid = %session.session_id, error = %e, "Credential initialization failed");
            return TurnDirective::speak(APOLOGY_RETRY, TurnAction::Continue);
        }

        let summary = match self.mailbox.get_emails(&session.user_id, self.max_emails).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(call_sid = %session.session_id, error = %e, "Inbox triage failed");
                return TurnDirective::speak(APOLOGY_RETRY, TurnAction::Continue);
            }
        };

        session.mode = Mode::EmailReading;
        let text = format!(
            "Sure! Let me check your emails. {summary}. I'll start reading them one by one. \
             You can say 'respond' during any email if you'd like to reply to it."
        );
        TurnDirective::speak(text, TurnAction::StartEmailReading)
    }

    async fn handle_email_reading(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> TurnDirective {
        match classify(Mode::EmailReading, utterance) {
            Intent::ReadFullEmail => match self.mailbox.read_full_current_email(&session.user_id).await {
                Ok(body) => TurnDirective::speak(
                    format!("{body} {READING_CHOICE_TAIL}"),
                    TurnAction::Continue,
                ),
                Err(e) => {
                    warn!(call_sid = %session.session_id, error = %e, "Full read failed");
                    TurnDirective::speak(
                        "I had trouble reading that email. Let me continue.",
                        TurnAction::ContinueReading,
                    )
                }
            },
            Intent::Advance => match self.mailbox.advance(&session.user_id).await {
                Ok(AdvanceOutcome::Exhausted) => {
                    session.mode = Mode::General;
                    TurnDirective::speak(
                        "That's all your emails! Is there anything else I can help you with?",
                        TurnAction::Continue,
                    )
                }
                Ok(AdvanceOutcome::Moved(confirmation)) => TurnDirective::speak(
                    format!("{confirmation}. Moving to the next email."),
                    TurnAction::ReadNextEmail,
                ),
                Err(e) => {
                    warn!(call_sid = %session.session_id, error = %e, "Cursor advance failed");
                    TurnDirective::speak(APOLOGY_RETRY, TurnAction::ContinueReading)
                }
            },
            Intent::BeginReply => match self.mailbox.current_email(&session.user_id).await {
                Ok(current) => {
                    session.context.responding_to = Some(current.email);
                    session.mode = Mode::Responding;
                    TurnDirective::speak(
                        "What would you like me to say in your response?",
                        TurnAction::WaitForResponseContent,
                    )
                }
                Err(e) => {
                    warn!(call_sid = %session.session_id, error = %e, "Could not load email for reply");
                    TurnDirective::speak(
                        "I couldn't get the current email details. Let me continue reading.",
                        TurnAction::ContinueReading,
                    )
                }
            },
            Intent::EndReading => {
                session.mode = Mode::General;
                TurnDirective::speak(
                    "Okay, I've stopped reading emails. Is there anything else I can help you with?",
                    TurnAction::Continue,
                )
            }
            _ => TurnDirective::speak(READING_MENU, TurnAction::ContinueReading),
        }
    }

    async fn handle_responding(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> TurnDirective {
        // Reply body is the utterance, verbatim.
        let Some(email) = session.context.responding_to.take() else {
            session.mode = Mode::EmailReading;
            return TurnDirective::with_tts(
                "I lost track of which email you wanted to respond to. Let me continue reading emails.",
                "Let me continue reading emails.",
                TurnAction::ContinueReading,
            );
        };

        let subject = if email.subject.starts_with("Re:") {
            email.subject.clone()
        } else {
            format!("Re: {}", email.subject)
        };

        session.mode = Mode::EmailReading;
        match self
            .mailbox
            .send_reply(&session.user_id, &email.sender, &subject, utterance)
            .await
        {
            Ok(confirmation) => TurnDirective::with_tts(
                format!(
                    "I've sent your reply. {confirmation}. Would you like me to continue reading more emails?"
                ),
                "I've sent your reply. Would you like me to continue reading more emails?",
                TurnAction::ContinueReading,
            ),
            Err(e) => {
                warn!(call_sid = %session.session_id, error = %e, "Reply send failed");
                TurnDirective::speak(
                    "I had trouble sending that response. Let me continue reading emails.",
                    TurnAction::ContinueReading,
                )
            }
        }
    }

    async fn handle_general(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> TurnDirective {
        let intent = classify(Mode::General, utterance);

        // A pending task prompt captures the next utterance as the title.
        // Recognized intents escape the capture instead of becoming a task
        // named "read my emails"; either way the prompt is spent.
        if session.context.awaiting_task {
            session.context.awaiting_task = false;
            if matches!(intent, Intent::GeneralChat | Intent::PromptTask) {
                return match self.mailbox.create_task(&session.user_id, utterance, "").await {
                    Ok(confirmation) => TurnDirective::speak(confirmation, TurnAction::Continue),
                    Err(e) => {
                        warn!(call_sid = %session.session_id, error = %e, "Task creation failed");
                        TurnDirective::speak(APOLOGY_RETRY, TurnAction::Continue)
                    }
                };
            }
        }

        match intent {
            Intent::StartEmailReading => {
                // Same flow as greeting: triage then read.
                session.mode = Mode::Greeting;
                self.start_email_reading(session).await
            }
            Intent::ShowCalendar => match self.mailbox.calendar_events(&session.user_id, 7).await {
                Ok(events) => TurnDirective::speak(events, TurnAction::Continue),
                Err(e) => {
                    warn!(call_sid = %session.session_id, error = %e, "Calendar fetch failed");
                    TurnDirective::speak(APOLOGY_RETRY, TurnAction::Continue)
                }
            },
            Intent::PromptTask => {
                session.context.awaiting_task = true;
                TurnDirective::speak(
                    "I can help you create tasks. What task would you like me to add?",
                    TurnAction::Continue,
                )
            }
            Intent::EndCall => TurnDirective::speak(
                "You're welcome! Have a great day. Goodbye!",
                TurnAction::EndCall,
            ),
            _ => self
                .generative_reply(session, prompts::GENERAL_SYSTEM, utterance, 100, GENERAL_FALLBACK)
                .await,
        }
    }

    /// Generative fallback with canned-line degradation. Never propagates
    /// the provider's error.
    async fn generative_reply(
        &self,
        session: &ConversationSession,
        system_prompt: &str,
        utterance: &str,
        max_tokens: u32,
        fallback: &str,
    ) -> TurnDirective {
        let text = match self
            .llm
            .generate(system_prompt, session.history_window(), utterance, max_tokens, 0.7)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(call_sid = %session.session_id, error = %e, "Generative fallback degraded to canned line");
                fallback.to_string()
            }
        };
        TurnDirective::speak(text, TurnAction::Continue)
    }
}
