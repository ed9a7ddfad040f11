//! Webhook routes: the turn-by-turn surface Twilio drives.
//!
//! Every turn of a call arrives as an independent POST here. The handlers
//! resolve the session, run the state machine, and render the resulting
//! directive into the TwiML for the next turn. The match over `TurnAction`
//! is exhaustive, so an unroutable action cannot reach this layer.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::convo::engine::{ConversationEngine, TurnAction, TurnDirective};
use crate::convo::registry::SessionRegistry;
use crate::voice::twilio::TwilioClient;
use crate::voice::twiml::VoiceResponse;

const WELCOME: &str = "Hello! I'm your personal email assistant. How can I help you today? \
You can ask me to read your emails, check your calendar, or manage tasks.";

const NO_INPUT_REPROMPT: &str = "I didn't hear anything. Please let me know how I can help you.";

const SESSION_LOST: &str = "I'm sorry, I lost our conversation. Let me restart.";

const READING_FALLBACK: &str =
    "Say 'respond' to reply, 'next' for the next email, or 'stop' to finish.";

const REPLY_REPROMPT: &str = "I didn't hear your response. What would you like me to say?";

const ANYTHING_ELSE: &str = "How else can I help you?";

/// Fixed line for the degraded (no voice provider) state.
const DEGRADED_APOLOGY: &str =
    "I'm sorry, the voice assistant is temporarily unavailable. Please try again later.";

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub engine: Arc<ConversationEngine>,
    /// `None` means the voice provider is unavailable (degraded mode).
    pub twilio: Option<Arc<TwilioClient>>,
    /// Public base URL for callback documents handed to Twilio.
    pub base_url: String,
}

/// Per-turn form payload from Twilio. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct TurnPayload {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "From", default)]
    pub from: Option<String>,
    #[serde(rename = "SpeechResult", default)]
    pub speech_result: Option<String>,
}

/// Call status callback payload.
#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "CallStatus", default)]
    pub call_status: Option<String>,
}

/// Call statuses that terminate the session.
const TERMINAL_STATUSES: &[&str] = &["completed", "failed", "busy", "no-answer"];

#[derive(Debug, Deserialize)]
struct MakeCallRequest {
    phone_number: String,
    #[serde(default)]
    test_mode: bool,
}

/// Build the full webhook router.
pub fn voice_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/make-call", post(make_call))
        .route("/voice/greeting", post(voice_greeting))
        .route("/voice/process_input", post(voice_process_input))
        .route("/voice/read_email", post(voice_read_email))
        .route("/voice/status", post(voice_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn twiml(xml: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml")], xml)
}

// ── Service surface ─────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Voice email assistant"
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let degraded = state.twilio.is_none();
    Json(serde_json::json!({
        "status": if degraded { "degraded" } else { "healthy" },
        "service": "voice-assist",
        "voice": if degraded { "unconfigured" } else { "ok" },
        "live_sessions": state.registry.len().await,
    }))
}

async fn make_call(
    State(state): State<AppState>,
    Json(req): Json<MakeCallRequest>,
) -> impl IntoResponse {
    let Some(twilio) = &state.twilio else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "voice provider is not configured"})),
        )
            .into_response();
    };

    match twilio
        .create_call(&req.phone_number, &state.base_url, req.test_mode)
        .await
    {
        Ok(call_sid) => Json(serde_json::json!({
            "message": "Call initiated successfully",
            "call_sid": call_sid,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

// ── Voice webhooks ──────────────────────────────────────────────────────

/// Initial greeting. The session itself is created lazily on the first
/// processed turn, not here.
async fn voice_greeting(
    State(state): State<AppState>,
    Form(payload): Form<TurnPayload>,
) -> impl IntoResponse {
    if state.twilio.is_none() {
        return twiml(VoiceResponse::new().say(DEGRADED_APOLOGY).hangup().build());
    }

    info!(call_sid = %payload.call_sid, "Greeting a caller");
    twiml(
        VoiceResponse::new()
            .say(WELCOME)
            .gather_speech("/voice/process_input")
            .say(NO_INPUT_REPROMPT)
            .redirect("/voice/greeting")
            .build(),
    )
}

/// The turn endpoint: one utterance in, one directive rendered out.
async fn voice_process_input(
    State(state): State<AppState>,
    Form(payload): Form<TurnPayload>,
) -> impl IntoResponse {
    if state.twilio.is_none() {
        return twiml(VoiceResponse::new().say(DEGRADED_APOLOGY).hangup().build());
    }

    let user_id = payload
        .from
        .clone()
        .unwrap_or_else(|| payload.call_sid.clone());
    let utterance = payload.speech_result.unwrap_or_default();

    // First-touch creation: a miss after a restart lands here as a fresh
    // session in Greeting mode, which restarts the flow.
    let handle = state
        .registry
        .get_or_create(&payload.call_sid, &user_id)
        .await;

    // Holding the lock across the whole turn serializes overlapping
    // requests for this call.
    let directive = {
        let mut session = handle.lock().await;
        state.engine.process_turn(&mut session, &utterance).await
    };

    if directive.action == TurnAction::EndCall {
        state.registry.destroy(&payload.call_sid).await;
    }

    twiml(render_directive(&directive))
}

/// The email-presentation step: speak the current email, then listen.
async fn voice_read_email(
    State(state): State<AppState>,
    Form(payload): Form<TurnPayload>,
) -> impl IntoResponse {
    if state.twilio.is_none() {
        return twiml(VoiceResponse::new().say(DEGRADED_APOLOGY).hangup().build());
    }

    let Some(handle) = state.registry.get(&payload.call_sid).await else {
        warn!(call_sid = %payload.call_sid, "Session miss during read, restarting greeting");
        return twiml(
            VoiceResponse::new()
                .say(SESSION_LOST)
                .redirect("/voice/greeting")
                .build(),
        );
    };

    let text = {
        let session = handle.lock().await;
        state.engine.presentation_text(&session).await
    };

    twiml(
        VoiceResponse::new()
            .say(&text)
            .gather_speech("/voice/process_input")
            .say(READING_FALLBACK)
            .redirect("/voice/read_email")
            .build(),
    )
}

/// Status callback: terminal statuses destroy the session.
async fn voice_status(
    State(state): State<AppState>,
    Form(payload): Form<StatusPayload>,
) -> impl IntoResponse {
    let status = payload.call_status.unwrap_or_default();
    info!(call_sid = %payload.call_sid, %status, "Call status update");

    if TERMINAL_STATUSES.contains(&status.as_str()) {
        state.registry.destroy(&payload.call_sid).await;
    }

    ([(header::CONTENT_TYPE, "text/plain")], "OK")
}

/// Map a directive onto the next-turn TwiML document. One rendering rule
/// per action; this is the complete contract between core and transport.
fn render_directive(directive: &TurnDirective) -> String {
    let response = VoiceResponse::new().say(&directive.tts_text);
    match directive.action {
        TurnAction::EndCall => response.hangup().build(),
        TurnAction::StartEmailReading
        | TurnAction::ReadNextEmail
        | TurnAction::ContinueReading => response.redirect("/voice/read_email").build(),
        TurnAction::WaitForResponseContent => response
            .gather_speech("/voice/process_input")
            .say(REPLY_REPROMPT)
            .redirect("/voice/process_input")
            .build(),
        TurnAction::Continue => response
            .gather_speech("/voice/process_input")
            .say(ANYTHING_ELSE)
            .redirect("/voice/process_input")
            .build(),
    }
}
