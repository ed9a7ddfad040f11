//! End-to-end webhook flow tests.
//!
//! Each test spins up two real Axum servers on random ports: a stub mailbox
//! tool service speaking the `invoke_tool` protocol, and the voice webhook
//! service wired to it through the real HTTP client. A call is then driven
//! turn by turn with form POSTs the way Twilio would.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use voice_assist::config::{MailboxSettings, TwilioConfig};
use voice_assist::convo::engine::ConversationEngine;
use voice_assist::convo::registry::SessionRegistry;
use voice_assist::error::LlmError;
use voice_assist::llm::{ChatMessage, LlmProvider};
use voice_assist::mailbox::HttpMailboxClient;
use voice_assist::voice::routes::{AppState, voice_routes};
use voice_assist::voice::twilio::TwilioClient;

// ── Stub mailbox tool service ───────────────────────────────────────────

#[derive(Clone)]
struct StubMailboxState {
    inner: Arc<Mutex<StubInner>>,
}

struct StubInner {
    cursor: usize,
    emails: Vec<serde_json::Value>,
    sent: Vec<(String, String, String)>,
    fail_get_emails: bool,
}

impl StubMailboxState {
    fn new(fail_get_emails: bool) -> Self {
        let emails = vec![
            serde_json::json!({
                "id": "m1",
                "sender": "alice@example.com",
                "subject": "Meeting tomorrow",
                "body": "Can we meet at 3 pm?",
            }),
            serde_json::json!({
                "id": "m2",
                "sender": "noreply@shop.example.com",
                "subject": "Your weekly digest",
                "body": "Deals deals deals.",
            }),
        ];
        Self {
            inner: Arc::new(Mutex::new(StubInner {
                cursor: 0,
                emails,
                sent: Vec::new(),
                fail_get_emails,
            })),
        }
    }
}

async fn invoke_tool(
    State(state): State<StubMailboxState>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let tool = body["tool"].as_str().unwrap_or_default().to_string();
    let mut inner = state.inner.lock().await;

    let (result, success) = match tool.as_str() {
        "initialize_creds" => ("Credentials initialized".to_string(), true),
        "get_emails" => {
            if inner.fail_get_emails {
                ("ERROR: mailbox unavailable".to_string(), true)
            } else {
                inner.cursor = 0;
                (
                    format!(
                        "Found {} emails: 1 high priority, 1 low priority",
                        inner.emails.len()
                    ),
                    true,
                )
            }
        }
        "get_current_email" => match inner.emails.get(inner.cursor) {
            Some(email) => (
                serde_json::json!({
                    "email": email,
                    "position": format!("{} of {}", inner.cursor + 1, inner.emails.len()),
                })
                .to_string(),
                true,
            ),
            None => ("ERROR: No more emails to read".to_string(), true),
        },
        "get_current_email_for_reading" => match inner.emails.get(inner.cursor) {
            Some(email) => (
                format!(
                    "Email {} of {}. From {}. Subject: {}.",
                    inner.cursor + 1,
                    inner.emails.len(),
                    email["sender"].as_str().unwrap(),
                    email["subject"].as_str().unwrap(),
                ),
                true,
            ),
            None => ("No more emails to read".to_string(), true),
        },
        "read_full_current_email" => match inner.emails.get(inner.cursor) {
            Some(email) => (email["body"].as_str().unwrap().to_string(), true),
            None => ("No more emails to read".to_string(), true),
        },
        "next_email" => {
            inner.cursor += 1;
            if inner.cursor >= inner.emails.len() {
                ("No more emails to read".to_string(), true)
            } else {
                (
                    format!("Moved to email {} of {}", inner.cursor + 1, inner.emails.len()),
                    true,
                )
            }
        }
        "send_email_reply" => {
            let args = &body["arguments"];
            inner.sent.push((
                args["recipient"].as_str().unwrap_or_default().to_string(),
                args["subject"].as_str().unwrap_or_default().to_string(),
                args["body"].as_str().unwrap_or_default().to_string(),
            ));
            ("Email reply sent".to_string(), true)
        }
        "get_calendar_events" => ("No calendar events in the next 7 days".to_string(), true),
        "create_task" => ("Task created".to_string(), true),
        _ => (format!("unknown tool {tool}"), false),
    };

    Json(serde_json::json!({ "result": result, "success": success }))
}

async fn start_stub_mailbox(fail_get_emails: bool) -> (String, StubMailboxState) {
    let state = StubMailboxState::new(fail_get_emails);
    let app = Router::new()
        .route("/invoke_tool", post(invoke_tool))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

// ── Stub LLM ────────────────────────────────────────────────────────────

struct StubLlm;

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }
    async fn generate(
        &self,
        _system_prompt: &str,
        _history: &[ChatMessage],
        _utterance: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        Ok("Happy to help with emails, calendar, or tasks.".to_string())
    }
}

// ── Voice service under test ────────────────────────────────────────────

async fn start_voice_service(mailbox_url: &str) -> (String, Arc<SessionRegistry>) {
    let mailbox = Arc::new(HttpMailboxClient::new(MailboxSettings {
        base_url: mailbox_url.to_string(),
        timeout: Duration::from_secs(5),
        max_emails: 5,
    }));
    let engine = Arc::new(ConversationEngine::new(mailbox, Arc::new(StubLlm), 5));
    let registry = SessionRegistry::new();

    let state = AppState {
        registry: Arc::clone(&registry),
        engine,
        twilio: Some(Arc::new(TwilioClient::new(TwilioConfig {
            account_sid: "AC_test".to_string(),
            auth_token: secrecy::SecretString::from("token"),
            from_number: "+15550000000".to_string(),
        }))),
        base_url: "http://localhost:8000".to_string(),
    };
    let app = voice_routes(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), registry)
}

async fn turn(base: &str, endpoint: &str, call_sid: &str, speech: &str) -> String {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}{endpoint}"))
        .form(&[
            ("CallSid", call_sid),
            ("From", "+15551234567"),
            ("SpeechResult", speech),
        ])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.text().await.unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_call_reads_replies_and_hangs_up() {
    let (mailbox_url, mailbox) = start_stub_mailbox(false).await;
    let (base, _registry) = start_voice_service(&mailbox_url).await;

    // Greeting: welcome + gather, no session yet.
    let xml = turn(&base, "/voice/greeting", "CA100", "").await;
    assert!(xml.contains("personal email assistant"));

    // Turn 1: ask for email → triage summary, routed to the presentation step.
    let xml = turn(&base, "/voice/process_input", "CA100", "read my emails").await;
    assert!(xml.contains("Found 2 emails"));
    assert!(xml.contains("/voice/read_email"));

    // Presentation step: first email's subject prompt.
    let xml = turn(&base, "/voice/read_email", "CA100", "").await;
    assert!(xml.contains("Meeting tomorrow"));

    // Reply flow: dictate and send verbatim.
    let xml = turn(&base, "/voice/process_input", "CA100", "respond").await;
    assert!(xml.contains("What would you like me to say"));

    let xml = turn(
        &base,
        "/voice/process_input",
        "CA100",
        "Tell them I'll be late",
    )
    .await;
    assert!(xml.contains("sent your reply"));

    let sent = mailbox.inner.lock().await.sent.clone();
    assert_eq!(
        sent,
        vec![(
            "alice@example.com".to_string(),
            "Re: Meeting tomorrow".to_string(),
            "Tell them I'll be late".to_string(),
        )]
    );

    // Advance past the second email to exhaustion.
    let xml = turn(&base, "/voice/process_input", "CA100", "next").await;
    assert!(xml.contains("Moving to the next email"));
    let xml = turn(&base, "/voice/process_input", "CA100", "next").await;
    assert!(xml.contains("That's all your emails"));

    // Farewell ends the call.
    let xml = turn(&base, "/voice/process_input", "CA100", "thank you, goodbye").await;
    assert!(xml.contains("<Hangup/>"));
}

#[tokio::test]
async fn mailbox_failure_degrades_to_retry_prompt() {
    let (mailbox_url, _mailbox) = start_stub_mailbox(true).await;
    let (base, registry) = start_voice_service(&mailbox_url).await;

    let xml = turn(&base, "/voice/process_input", "CA200", "check my email").await;
    // The error-marked result becomes an apology, not dead air or a crash.
    assert!(xml.contains("Could you please try again"));

    // Mode untouched: still greeting, so the caller can retry.
    let handle = registry.get("CA200").await.unwrap();
    let session = handle.lock().await;
    assert_eq!(session.mode, voice_assist::convo::session::Mode::Greeting);
}

#[tokio::test]
async fn status_callback_ends_session_and_next_turn_restarts() {
    let (mailbox_url, _mailbox) = start_stub_mailbox(false).await;
    let (base, registry) = start_voice_service(&mailbox_url).await;

    turn(&base, "/voice/process_input", "CA300", "read my emails").await;
    assert!(registry.get("CA300").await.is_some());

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/voice/status"))
        .form(&[("CallSid", "CA300"), ("CallStatus", "completed")])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(registry.get("CA300").await.is_none());

    // A stray later turn is a fresh start in greeting mode, not a crash.
    let xml = turn(&base, "/voice/process_input", "CA300", "hello?").await;
    assert!(!xml.trim().is_empty());
    let handle = registry.get("CA300").await.unwrap();
    assert_eq!(
        handle.lock().await.mode,
        voice_assist::convo::session::Mode::Greeting
    );
}
