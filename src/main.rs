use std::sync::Arc;

use voice_assist::config::AppConfig;
use voice_assist::convo::engine::ConversationEngine;
use voice_assist::convo::registry::SessionRegistry;
use voice_assist::llm::create_provider;
use voice_assist::mailbox::{HttpMailboxClient, MailboxTools};
use voice_assist::voice::routes::{AppState, voice_routes};
use voice_assist::voice::twilio::TwilioClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("📞 Voice Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Mailbox service: {}", config.mailbox.base_url);
    eprintln!("   Base URL: {}", config.base_url);

    let llm = create_provider(&config.llm);
    let mailbox: Arc<dyn MailboxTools> =
        Arc::new(HttpMailboxClient::new(config.mailbox.clone()));
    let engine = Arc::new(ConversationEngine::new(
        mailbox,
        llm,
        config.mailbox.max_emails,
    ));
    let registry = SessionRegistry::new();

    let twilio = match config.twilio.clone() {
        Some(twilio_config) => {
            eprintln!("   Twilio: enabled (from {})", twilio_config.from_number);
            Some(Arc::new(TwilioClient::new(twilio_config)))
        }
        None => {
            // Degraded mode: health answers, voice endpoints apologize.
            eprintln!("   Twilio: not configured, running degraded");
            None
        }
    };

    let state = AppState {
        registry,
        engine,
        twilio,
        base_url: config.base_url.clone(),
    };
    let app = voice_routes(state);

    let bind = format!("{}:{}", config.bind_host, config.bind_port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, "Voice webhook server started");
    eprintln!("   Listening on http://{bind}\n");

    axum::serve(listener, app).await?;
    Ok(())
}
